//! Run Repository
//!
//! The run ledger's storage. Run numbers are assigned here, at insert time,
//! so that they stay unique and gap-free per pipeline even when several
//! triggers race.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use otto_core::domain::run::{
    NewRun, PipelineRun, RunStatus, RunTrigger, RunUpdate, WebhookTriggerData,
};
use otto_core::dto::run::PageRequest;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult};

/// Attempts at inserting a run before giving up on a contended run number
const MAX_NUMBER_ATTEMPTS: usize = 5;

/// Storage port for pipeline runs
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Appends a queued run with the next run number of its pipeline
    async fn create_next(&self, new: NewRun) -> StoreResult<PipelineRun>;

    /// Applies a status change atomically; `None` if the run does not exist
    async fn update_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        update: RunUpdate,
    ) -> StoreResult<Option<PipelineRun>>;

    async fn find_by_id(&self, run_id: Uuid) -> StoreResult<Option<PipelineRun>>;

    /// A page of a pipeline's runs, most recently started first, together
    /// with the total number of runs of the pipeline
    async fn list_by_pipeline(
        &self,
        pipeline_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<(Vec<PipelineRun>, u64)>;

    /// The most recently started run, the same one that heads the first page
    /// of `list_by_pipeline`
    async fn latest(&self, pipeline_id: Uuid) -> StoreResult<Option<PipelineRun>>;
}

/// Most recently started first; run number breaks ties
fn newest_first(a: &PipelineRun, b: &PipelineRun) -> std::cmp::Ordering {
    b.started_at
        .cmp(&a.started_at)
        .then(b.run_number.cmp(&a.run_number))
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    runs: RwLock<HashMap<Uuid, PipelineRun>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn create_next(&self, new: NewRun) -> StoreResult<PipelineRun> {
        // Number assignment and insert happen under the same write lock
        let mut runs = self.runs.write().await;
        let last = runs
            .values()
            .filter(|r| r.pipeline_id == new.pipeline_id)
            .map(|r| r.run_number)
            .max()
            .unwrap_or(0);

        let run = PipelineRun::queued(Uuid::new_v4(), last + 1, new, Utc::now());
        runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn update_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        update: RunUpdate,
    ) -> StoreResult<Option<PipelineRun>> {
        let mut runs = self.runs.write().await;
        let Some(run) = runs.get_mut(&run_id) else {
            return Ok(None);
        };

        run.apply_status(status, update, Utc::now())?;
        Ok(Some(run.clone()))
    }

    async fn find_by_id(&self, run_id: Uuid) -> StoreResult<Option<PipelineRun>> {
        Ok(self.runs.read().await.get(&run_id).cloned())
    }

    async fn list_by_pipeline(
        &self,
        pipeline_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<(Vec<PipelineRun>, u64)> {
        let runs = self.runs.read().await;
        let mut matching: Vec<_> = runs
            .values()
            .filter(|r| r.pipeline_id == pipeline_id)
            .cloned()
            .collect();
        matching.sort_by(newest_first);

        let total = matching.len() as u64;
        let page_runs = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();

        Ok((page_runs, total))
    }

    async fn latest(&self, pipeline_id: Uuid) -> StoreResult<Option<PipelineRun>> {
        let runs = self.runs.read().await;
        Ok(runs
            .values()
            .filter(|r| r.pipeline_id == pipeline_id)
            .min_by(|a, b| newest_first(a, b))
            .cloned())
    }
}

// =============================================================================
// Postgres implementation
// =============================================================================

#[derive(Debug, Clone)]
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn try_insert(&self, new: &NewRun) -> Result<PipelineRun, sqlx::Error> {
        let now = Utc::now();
        let webhook_data = new
            .webhook_data
            .as_ref()
            .map(sqlx::types::Json);

        // The UNIQUE (pipeline_id, run_number) constraint rejects a
        // concurrent writer that computed the same number
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            INSERT INTO pipeline_runs (
                id, pipeline_id, run_number, trigger, trigger_by, status,
                started_at, webhook_data, pipeline_snapshot, created_at, updated_at
            )
            SELECT $1, $2, COALESCE(MAX(run_number), 0) + 1, $3, $4, $5,
                   $6, $7, $8, $6, $6
            FROM pipeline_runs
            WHERE pipeline_id = $2
            RETURNING id, pipeline_id, run_number, trigger, trigger_by, status,
                      started_at, completed_at, duration_secs, webhook_data,
                      pipeline_snapshot, logs_url, result_message, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.pipeline_id)
        .bind(new.trigger.as_str())
        .bind(&new.trigger_by)
        .bind(RunStatus::Queued.as_str())
        .bind(now)
        .bind(webhook_data)
        .bind(&new.pipeline_snapshot)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn create_next(&self, new: NewRun) -> StoreResult<PipelineRun> {
        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            match self.try_insert(&new).await {
                Ok(run) => return Ok(run),
                Err(e) if is_unique_violation(&e) => {
                    tracing::debug!(
                        "Run number for pipeline {} taken concurrently (attempt {})",
                        new.pipeline_id,
                        attempt
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::RunNumberConflict(new.pipeline_id))
    }

    async fn update_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        update: RunUpdate,
    ) -> StoreResult<Option<PipelineRun>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RunRow>(
            r#"
            SELECT id, pipeline_id, run_number, trigger, trigger_by, status,
                   started_at, completed_at, duration_secs, webhook_data,
                   pipeline_snapshot, logs_url, result_message, created_at, updated_at
            FROM pipeline_runs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(run_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut run: PipelineRun = row.into();
        run.apply_status(status, update, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE pipeline_runs
            SET status = $1, completed_at = $2, duration_secs = $3,
                logs_url = $4, result_message = $5, updated_at = $6
            WHERE id = $7
            "#,
        )
        .bind(run.status.as_str())
        .bind(run.completed_at)
        .bind(run.duration.map(|d| d as i64))
        .bind(&run.logs_url)
        .bind(&run.result_message)
        .bind(run.updated_at)
        .bind(run.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(run))
    }

    async fn find_by_id(&self, run_id: Uuid) -> StoreResult<Option<PipelineRun>> {
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            SELECT id, pipeline_id, run_number, trigger, trigger_by, status,
                   started_at, completed_at, duration_secs, webhook_data,
                   pipeline_snapshot, logs_url, result_message, created_at, updated_at
            FROM pipeline_runs
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_by_pipeline(
        &self,
        pipeline_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<(Vec<PipelineRun>, u64)> {
        let rows = sqlx::query_as::<_, RunRow>(
            r#"
            SELECT id, pipeline_id, run_number, trigger, trigger_by, status,
                   started_at, completed_at, duration_secs, webhook_data,
                   pipeline_snapshot, logs_url, result_message, created_at, updated_at
            FROM pipeline_runs
            WHERE pipeline_id = $1
            ORDER BY started_at DESC, run_number DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(pipeline_id)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM pipeline_runs WHERE pipeline_id = $1")
                .bind(pipeline_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((
            rows.into_iter().map(|r| r.into()).collect(),
            total.max(0) as u64,
        ))
    }

    async fn latest(&self, pipeline_id: Uuid) -> StoreResult<Option<PipelineRun>> {
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            SELECT id, pipeline_id, run_number, trigger, trigger_by, status,
                   started_at, completed_at, duration_secs, webhook_data,
                   pipeline_snapshot, logs_url, result_message, created_at, updated_at
            FROM pipeline_runs
            WHERE pipeline_id = $1
            ORDER BY started_at DESC, run_number DESC
            LIMIT 1
            "#,
        )
        .bind(pipeline_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn string_to_status(s: &str) -> RunStatus {
    match s {
        "queued" => RunStatus::Queued,
        "running" => RunStatus::Running,
        "success" => RunStatus::Success,
        "failed" => RunStatus::Failed,
        "cancelled" => RunStatus::Cancelled,
        _ => RunStatus::Queued,
    }
}

fn string_to_trigger(s: &str) -> RunTrigger {
    match s {
        "webhook" => RunTrigger::Webhook,
        "schedule" => RunTrigger::Schedule,
        _ => RunTrigger::Manual,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    pipeline_id: Uuid,
    run_number: i32,
    trigger: String,
    trigger_by: String,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    duration_secs: Option<i64>,
    webhook_data: Option<sqlx::types::Json<WebhookTriggerData>>,
    pipeline_snapshot: String,
    logs_url: Option<String>,
    result_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RunRow> for PipelineRun {
    fn from(row: RunRow) -> Self {
        PipelineRun {
            id: row.id,
            pipeline_id: row.pipeline_id,
            run_number: row.run_number.max(0) as u32,
            trigger: string_to_trigger(&row.trigger),
            trigger_by: row.trigger_by,
            status: string_to_status(&row.status),
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration: row.duration_secs.map(|d| d.max(0) as u64),
            webhook_data: row.webhook_data.map(|j| j.0),
            pipeline_snapshot: row.pipeline_snapshot,
            logs_url: row.logs_url,
            result_message: row.result_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    fn new_run(pipeline_id: Uuid) -> NewRun {
        NewRun {
            pipeline_id,
            trigger: RunTrigger::Manual,
            trigger_by: "user-1".to_string(),
            pipeline_snapshot: r#"{"blocks":[]}"#.to_string(),
            webhook_data: None,
        }
    }

    #[tokio::test]
    async fn test_numbers_are_sequential_per_pipeline() {
        let store = InMemoryRunStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        for expected in 1..=3 {
            let run = store.create_next(new_run(a)).await.unwrap();
            assert_eq!(run.run_number, expected);
            assert_eq!(run.status, RunStatus::Queued);
        }

        let run = store.create_next(new_run(b)).await.unwrap();
        assert_eq!(run.run_number, 1);
    }

    #[tokio::test]
    async fn test_concurrent_creation_gets_unique_numbers() {
        let store = Arc::new(InMemoryRunStore::new());
        let pipeline_id = Uuid::new_v4();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create_next(new_run(pipeline_id)).await })
            })
            .collect();

        let mut numbers = HashSet::new();
        for handle in handles {
            let run = handle.await.unwrap().unwrap();
            numbers.insert(run.run_number);
        }

        assert_eq!(numbers, (1..=20).collect::<HashSet<u32>>());
    }

    #[tokio::test]
    async fn test_pagination_newest_first() {
        let store = InMemoryRunStore::new();
        let pipeline_id = Uuid::new_v4();
        for _ in 0..5 {
            store.create_next(new_run(pipeline_id)).await.unwrap();
        }

        let (runs, total) = store
            .list_by_pipeline(pipeline_id, PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        let numbers: Vec<_> = runs.iter().map(|r| r.run_number).collect();
        assert_eq!(numbers, vec![3, 2]);
        assert_eq!(total, 5);

        let (runs, _) = store
            .list_by_pipeline(pipeline_id, PageRequest::new(Some(4), Some(2)))
            .await
            .unwrap();
        assert!(runs.is_empty());
    }

    #[tokio::test]
    async fn test_latest_of_sequential_runs() {
        let store = InMemoryRunStore::new();
        let pipeline_id = Uuid::new_v4();
        assert!(store.latest(pipeline_id).await.unwrap().is_none());

        for _ in 0..3 {
            store.create_next(new_run(pipeline_id)).await.unwrap();
        }
        let latest = store.latest(pipeline_id).await.unwrap().unwrap();
        assert_eq!(latest.run_number, 3);
    }

    #[tokio::test]
    async fn test_latest_follows_start_time() {
        let store = InMemoryRunStore::new();
        let pipeline_id = Uuid::new_v4();
        for _ in 0..3 {
            store.create_next(new_run(pipeline_id)).await.unwrap();
        }

        // Run #3 got its number last but started before #2
        {
            let mut runs = store.runs.write().await;
            let second = runs
                .values()
                .find(|r| r.run_number == 2)
                .map(|r| r.started_at)
                .unwrap();
            let third = runs.values_mut().find(|r| r.run_number == 3).unwrap();
            third.started_at = second - chrono::Duration::seconds(1);
        }

        let latest = store.latest(pipeline_id).await.unwrap().unwrap();
        assert_eq!(latest.run_number, 2);

        let (first_page, _) = store
            .list_by_pipeline(pipeline_id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(first_page[0].id, latest.id);
    }

    #[tokio::test]
    async fn test_completion_is_idempotent() {
        let store = InMemoryRunStore::new();
        let run = store.create_next(new_run(Uuid::new_v4())).await.unwrap();

        store
            .update_status(run.id, RunStatus::Running, RunUpdate::default())
            .await
            .unwrap();
        let first = store
            .update_status(run.id, RunStatus::Success, RunUpdate::default())
            .await
            .unwrap()
            .unwrap();
        let second = store
            .update_status(run.id, RunStatus::Success, RunUpdate::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.completed_at, second.completed_at);
        assert_eq!(first.duration, second.duration);

        let err = store
            .update_status(run.id, RunStatus::Running, RunUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_update_unknown_run() {
        let store = InMemoryRunStore::new();
        let result = store
            .update_status(Uuid::new_v4(), RunStatus::Running, RunUpdate::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_survives_status_changes() {
        let store = InMemoryRunStore::new();
        let mut new = new_run(Uuid::new_v4());
        new.pipeline_snapshot = r#"{"blocks":[{"id":"v1"}]}"#.to_string();
        let run = store.create_next(new).await.unwrap();

        store
            .update_status(run.id, RunStatus::Failed, RunUpdate::default())
            .await
            .unwrap();
        let stored = store.find_by_id(run.id).await.unwrap().unwrap();
        assert_eq!(stored.pipeline_snapshot, r#"{"blocks":[{"id":"v1"}]}"#);
    }

    #[test]
    fn test_status_strings_round_trip() {
        for status in [
            RunStatus::Queued,
            RunStatus::Running,
            RunStatus::Success,
            RunStatus::Failed,
            RunStatus::Cancelled,
        ] {
            assert_eq!(string_to_status(status.as_str()), status);
        }
        assert_eq!(string_to_status("bogus"), RunStatus::Queued);
    }
}
