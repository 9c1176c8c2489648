//! Pipeline Repository
//!
//! Storage for pipeline definitions. The orchestrator only reads the current
//! definition to snapshot it into new runs; editing is exposed so the
//! definition can be kept next to the runs it produced.

use async_trait::async_trait;
use otto_core::domain::pipeline::PipelineDefinition;
use otto_core::dto::pipeline::{CreatePipeline, UpdatePipeline};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::StoreResult;

/// Storage port for pipeline definitions
#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn create(&self, req: CreatePipeline) -> StoreResult<PipelineDefinition>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<PipelineDefinition>>;

    /// All pipelines, newest first
    async fn list_all(&self) -> StoreResult<Vec<PipelineDefinition>>;

    /// Applies the given changes; `None` if the pipeline does not exist
    async fn update(
        &self,
        id: Uuid,
        req: UpdatePipeline,
    ) -> StoreResult<Option<PipelineDefinition>>;

    /// Returns whether a pipeline was deleted
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

fn new_definition(req: CreatePipeline) -> PipelineDefinition {
    let now = chrono::Utc::now();
    PipelineDefinition {
        id: Uuid::new_v4(),
        project_id: req.project_id,
        name: req.name,
        content: req.content,
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryPipelineStore {
    pipelines: RwLock<Vec<PipelineDefinition>>,
}

impl InMemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn create(&self, req: CreatePipeline) -> StoreResult<PipelineDefinition> {
        let pipeline = new_definition(req);
        self.pipelines.write().await.push(pipeline.clone());
        Ok(pipeline)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<PipelineDefinition>> {
        let pipelines = self.pipelines.read().await;
        Ok(pipelines.iter().find(|p| p.id == id).cloned())
    }

    async fn list_all(&self) -> StoreResult<Vec<PipelineDefinition>> {
        let pipelines = self.pipelines.read().await;
        Ok(pipelines.iter().rev().cloned().collect())
    }

    async fn update(
        &self,
        id: Uuid,
        req: UpdatePipeline,
    ) -> StoreResult<Option<PipelineDefinition>> {
        let mut pipelines = self.pipelines.write().await;
        let Some(pipeline) = pipelines.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(name) = req.name {
            pipeline.name = name;
        }
        if let Some(content) = req.content {
            pipeline.content = content;
        }
        pipeline.updated_at = chrono::Utc::now();

        Ok(Some(pipeline.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut pipelines = self.pipelines.write().await;
        let before = pipelines.len();
        pipelines.retain(|p| p.id != id);
        Ok(pipelines.len() != before)
    }
}

// =============================================================================
// Postgres implementation
// =============================================================================

#[derive(Debug, Clone)]
pub struct PgPipelineStore {
    pool: PgPool,
}

impl PgPipelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PipelineStore for PgPipelineStore {
    async fn create(&self, req: CreatePipeline) -> StoreResult<PipelineDefinition> {
        let pipeline = new_definition(req);

        sqlx::query(
            r#"
            INSERT INTO pipelines (id, project_id, name, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(pipeline.id)
        .bind(&pipeline.project_id)
        .bind(&pipeline.name)
        .bind(&pipeline.content)
        .bind(pipeline.created_at)
        .bind(pipeline.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(pipeline)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<PipelineDefinition>> {
        let row = sqlx::query_as::<_, PipelineRow>(
            r#"
            SELECT id, project_id, name, content, created_at, updated_at
            FROM pipelines
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_all(&self) -> StoreResult<Vec<PipelineDefinition>> {
        let rows = sqlx::query_as::<_, PipelineRow>(
            r#"
            SELECT id, project_id, name, content, created_at, updated_at
            FROM pipelines
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update(
        &self,
        id: Uuid,
        req: UpdatePipeline,
    ) -> StoreResult<Option<PipelineDefinition>> {
        let row = sqlx::query_as::<_, PipelineRow>(
            r#"
            UPDATE pipelines
            SET name = COALESCE($1, name),
                content = COALESCE($2, content),
                updated_at = $3
            WHERE id = $4
            RETURNING id, project_id, name, content, created_at, updated_at
            "#,
        )
        .bind(req.name)
        .bind(req.content)
        .bind(chrono::Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    project_id: String,
    name: String,
    content: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<PipelineRow> for PipelineDefinition {
    fn from(row: PipelineRow) -> Self {
        PipelineDefinition {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_req(name: &str) -> CreatePipeline {
        CreatePipeline {
            project_id: "proj-1".to_string(),
            name: name.to_string(),
            content: r#"{"blocks":[]}"#.to_string(),
        }
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = InMemoryPipelineStore::new();
        let pipeline = store.create(create_req("build")).await.unwrap();

        let updated = store
            .update(
                pipeline.id,
                UpdatePipeline {
                    name: None,
                    content: Some(r#"{"blocks":[{"id":"a"}]}"#.to_string()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "build");
        assert_eq!(updated.content, r#"{"blocks":[{"id":"a"}]}"#);

        assert!(store.delete(pipeline.id).await.unwrap());
        assert!(!store.delete(pipeline.id).await.unwrap());
        assert!(store.find_by_id(pipeline.id).await.unwrap().is_none());
        assert!(
            store
                .update(pipeline.id, UpdatePipeline::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = InMemoryPipelineStore::new();
        store.create(create_req("first")).await.unwrap();
        store.create(create_req("second")).await.unwrap();

        let names: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }
}
