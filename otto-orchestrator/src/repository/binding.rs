//! Binding Repository
//!
//! Storage for webhook bindings. Bindings are soft-deleted only, and lookups
//! resolve in insertion order so the oldest active binding wins when several
//! match the same repository branch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use otto_core::domain::binding::{ConflictPolicy, WebhookBinding};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult};

/// Storage port for webhook bindings
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Stores a new active binding, resolving clashes with existing active
    /// bindings for the same repository branch according to `policy`
    async fn insert(
        &self,
        binding: WebhookBinding,
        policy: ConflictPolicy,
    ) -> StoreResult<WebhookBinding>;

    /// First active binding, in insertion order, for the repository branch
    async fn find_active(&self, repo_id: i64, branch: &str)
    -> StoreResult<Option<WebhookBinding>>;

    /// Deactivates every binding of a pipeline.
    ///
    /// Returns whether the pipeline had any binding at all.
    async fn disable_pipeline(&self, pipeline_id: Uuid) -> StoreResult<bool>;

    /// Bindings of a project, in insertion order
    async fn list_by_project(&self, project_id: &str) -> StoreResult<Vec<WebhookBinding>>;

    /// Records that the binding just triggered a run
    async fn touch(&self, binding_id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryBindingStore {
    bindings: RwLock<Vec<WebhookBinding>>,
}

impl InMemoryBindingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BindingStore for InMemoryBindingStore {
    async fn insert(
        &self,
        binding: WebhookBinding,
        policy: ConflictPolicy,
    ) -> StoreResult<WebhookBinding> {
        let mut bindings = self.bindings.write().await;
        let repo_id = binding.github_repo_id;
        let branch = binding.trigger_branch.as_str();

        match policy {
            ConflictPolicy::AllowMultiple => {}
            ConflictPolicy::Reject => {
                if bindings.iter().any(|b| b.matches(repo_id, branch)) {
                    return Err(StoreError::BindingConflict {
                        repo_id,
                        branch: branch.to_string(),
                    });
                }
            }
            ConflictPolicy::Replace => {
                for existing in bindings.iter_mut().filter(|b| b.matches(repo_id, branch)) {
                    existing.is_active = false;
                }
            }
        }

        bindings.push(binding.clone());
        Ok(binding)
    }

    async fn find_active(
        &self,
        repo_id: i64,
        branch: &str,
    ) -> StoreResult<Option<WebhookBinding>> {
        let bindings = self.bindings.read().await;
        Ok(bindings.iter().find(|b| b.matches(repo_id, branch)).cloned())
    }

    async fn disable_pipeline(&self, pipeline_id: Uuid) -> StoreResult<bool> {
        let mut bindings = self.bindings.write().await;
        let mut found = false;
        for binding in bindings.iter_mut().filter(|b| b.pipeline_id == pipeline_id) {
            binding.is_active = false;
            found = true;
        }
        Ok(found)
    }

    async fn list_by_project(&self, project_id: &str) -> StoreResult<Vec<WebhookBinding>> {
        let bindings = self.bindings.read().await;
        Ok(bindings
            .iter()
            .filter(|b| b.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn touch(&self, binding_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut bindings = self.bindings.write().await;
        if let Some(binding) = bindings.iter_mut().find(|b| b.id == binding_id) {
            binding.last_triggered_at = Some(at);
        }
        Ok(())
    }
}

// =============================================================================
// Postgres implementation
// =============================================================================

#[derive(Debug, Clone)]
pub struct PgBindingStore {
    pool: PgPool,
}

impl PgBindingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BindingStore for PgBindingStore {
    async fn insert(
        &self,
        binding: WebhookBinding,
        policy: ConflictPolicy,
    ) -> StoreResult<WebhookBinding> {
        let mut tx = self.pool.begin().await?;

        if policy != ConflictPolicy::AllowMultiple {
            // Serialize connects for the same repository branch
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(format!("{}:{}", binding.github_repo_id, binding.trigger_branch))
                .execute(&mut *tx)
                .await?;

            let (existing,): (i64,) = sqlx::query_as(
                r#"
                SELECT COUNT(*) FROM webhook_bindings
                WHERE github_repo_id = $1 AND trigger_branch = $2 AND is_active
                "#,
            )
            .bind(binding.github_repo_id)
            .bind(&binding.trigger_branch)
            .fetch_one(&mut *tx)
            .await?;

            if existing > 0 {
                if policy == ConflictPolicy::Reject {
                    return Err(StoreError::BindingConflict {
                        repo_id: binding.github_repo_id,
                        branch: binding.trigger_branch.clone(),
                    });
                }

                sqlx::query(
                    r#"
                    UPDATE webhook_bindings SET is_active = FALSE
                    WHERE github_repo_id = $1 AND trigger_branch = $2 AND is_active
                    "#,
                )
                .bind(binding.github_repo_id)
                .bind(&binding.trigger_branch)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO webhook_bindings (
                id, pipeline_id, project_id, github_repo_id, github_repo_name,
                trigger_branch, is_active, created_at, last_triggered_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(binding.id)
        .bind(binding.pipeline_id)
        .bind(&binding.project_id)
        .bind(binding.github_repo_id)
        .bind(&binding.github_repo_name)
        .bind(&binding.trigger_branch)
        .bind(binding.is_active)
        .bind(binding.created_at)
        .bind(binding.last_triggered_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(binding)
    }

    async fn find_active(
        &self,
        repo_id: i64,
        branch: &str,
    ) -> StoreResult<Option<WebhookBinding>> {
        let row = sqlx::query_as::<_, BindingRow>(
            r#"
            SELECT id, pipeline_id, project_id, github_repo_id, github_repo_name,
                   trigger_branch, is_active, created_at, last_triggered_at
            FROM webhook_bindings
            WHERE github_repo_id = $1 AND trigger_branch = $2 AND is_active
            ORDER BY seq ASC
            LIMIT 1
            "#,
        )
        .bind(repo_id)
        .bind(branch)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn disable_pipeline(&self, pipeline_id: Uuid) -> StoreResult<bool> {
        let (found,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM webhook_bindings WHERE pipeline_id = $1)",
        )
        .bind(pipeline_id)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query("UPDATE webhook_bindings SET is_active = FALSE WHERE pipeline_id = $1")
            .bind(pipeline_id)
            .execute(&self.pool)
            .await?;

        Ok(found)
    }

    async fn list_by_project(&self, project_id: &str) -> StoreResult<Vec<WebhookBinding>> {
        let rows = sqlx::query_as::<_, BindingRow>(
            r#"
            SELECT id, pipeline_id, project_id, github_repo_id, github_repo_name,
                   trigger_branch, is_active, created_at, last_triggered_at
            FROM webhook_bindings
            WHERE project_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn touch(&self, binding_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE webhook_bindings SET last_triggered_at = $1 WHERE id = $2")
            .bind(at)
            .bind(binding_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct BindingRow {
    id: Uuid,
    pipeline_id: Uuid,
    project_id: String,
    github_repo_id: i64,
    github_repo_name: String,
    trigger_branch: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_triggered_at: Option<DateTime<Utc>>,
}

impl From<BindingRow> for WebhookBinding {
    fn from(row: BindingRow) -> Self {
        WebhookBinding {
            id: row.id,
            pipeline_id: row.pipeline_id,
            project_id: row.project_id,
            github_repo_id: row.github_repo_id,
            github_repo_name: row.github_repo_name,
            trigger_branch: row.trigger_branch,
            is_active: row.is_active,
            created_at: row.created_at,
            last_triggered_at: row.last_triggered_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(pipeline_id: Uuid, repo_id: i64, branch: &str) -> WebhookBinding {
        WebhookBinding {
            id: Uuid::new_v4(),
            pipeline_id,
            project_id: "proj-1".to_string(),
            github_repo_id: repo_id,
            github_repo_name: "acme/api".to_string(),
            trigger_branch: branch.to_string(),
            is_active: true,
            created_at: Utc::now(),
            last_triggered_at: None,
        }
    }

    #[tokio::test]
    async fn test_first_active_match_wins() {
        let store = InMemoryBindingStore::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        store
            .insert(binding(first, 1, "main"), ConflictPolicy::AllowMultiple)
            .await
            .unwrap();
        store
            .insert(binding(second, 1, "main"), ConflictPolicy::AllowMultiple)
            .await
            .unwrap();

        let found = store.find_active(1, "main").await.unwrap().unwrap();
        assert_eq!(found.pipeline_id, first);

        assert!(store.disable_pipeline(first).await.unwrap());
        let found = store.find_active(1, "main").await.unwrap().unwrap();
        assert_eq!(found.pipeline_id, second);
    }

    #[tokio::test]
    async fn test_no_match_for_other_branch_or_repo() {
        let store = InMemoryBindingStore::new();
        store
            .insert(binding(Uuid::new_v4(), 1, "main"), ConflictPolicy::AllowMultiple)
            .await
            .unwrap();

        assert!(store.find_active(1, "staging").await.unwrap().is_none());
        assert!(store.find_active(2, "main").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reject_policy() {
        let store = InMemoryBindingStore::new();
        store
            .insert(binding(Uuid::new_v4(), 1, "main"), ConflictPolicy::Reject)
            .await
            .unwrap();

        let err = store
            .insert(binding(Uuid::new_v4(), 1, "main"), ConflictPolicy::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::BindingConflict { repo_id: 1, .. }));

        // A different branch of the same repository is not a conflict
        store
            .insert(binding(Uuid::new_v4(), 1, "dev"), ConflictPolicy::Reject)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_replace_policy_deactivates_previous() {
        let store = InMemoryBindingStore::new();
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        store
            .insert(binding(old, 1, "main"), ConflictPolicy::Replace)
            .await
            .unwrap();
        store
            .insert(binding(new, 1, "main"), ConflictPolicy::Replace)
            .await
            .unwrap();

        let found = store.find_active(1, "main").await.unwrap().unwrap();
        assert_eq!(found.pipeline_id, new);

        let all = store.list_by_project("proj-1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(!all[0].is_active);
        assert!(all[1].is_active);
    }

    #[tokio::test]
    async fn test_disable_unknown_pipeline() {
        let store = InMemoryBindingStore::new();
        assert!(!store.disable_pipeline(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_touch_records_trigger_time() {
        let store = InMemoryBindingStore::new();
        let stored = store
            .insert(binding(Uuid::new_v4(), 1, "main"), ConflictPolicy::AllowMultiple)
            .await
            .unwrap();
        let at = Utc::now();
        store.touch(stored.id, at).await.unwrap();

        let found = store.find_active(1, "main").await.unwrap().unwrap();
        assert_eq!(found.last_triggered_at, Some(at));
    }
}
