//! Run Ledger
//!
//! Creates runs and moves them through their lifecycle. Every run, whatever
//! its trigger, enters the system through [`RunLedger::create_run`].

use std::sync::Arc;
use std::time::Duration;

use otto_core::domain::run::{
    NewRun, PipelineRun, RunStatus, RunTrigger, RunUpdate, TransitionError,
};
use uuid::Uuid;

use crate::repository::{PipelineStore, RunStore, StoreError};

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("run {0} not found")]
    NotFound(Uuid),

    #[error("pipeline {0} not found")]
    PipelineNotFound(Uuid),

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    InvalidTransition(TransitionError),

    /// Run number assignment kept losing races; the caller may retry
    #[error("could not assign a run number for pipeline {0}")]
    NumberConflict(Uuid),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RunError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidTransition(e) => RunError::InvalidTransition(e),
            StoreError::RunNumberConflict(id) => RunError::NumberConflict(id),
            other => RunError::Store(other),
        }
    }
}

impl RunError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RunError::NumberConflict(_) => true,
            RunError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunError>;

/// Entry point for creating runs and applying executor events
#[derive(Clone)]
pub struct RunLedger {
    runs: Arc<dyn RunStore>,
    auto_start_delay: Option<Duration>,
}

impl RunLedger {
    pub fn new(runs: Arc<dyn RunStore>) -> Self {
        Self {
            runs,
            auto_start_delay: None,
        }
    }

    /// Moves every new run to `running` after `delay`, for deployments
    /// without an executor reporting starts
    pub fn with_auto_start(mut self, delay: Option<Duration>) -> Self {
        self.auto_start_delay = delay;
        self
    }

    /// Append a queued run with the next run number of its pipeline
    pub async fn create_run(&self, new: NewRun) -> Result<PipelineRun> {
        if new.trigger_by.trim().is_empty() {
            return Err(RunError::ValidationError(
                "Trigger origin cannot be empty".to_string(),
            ));
        }

        let run = self.runs.create_next(new).await?;

        tracing::info!(
            "Run #{} ({}) created for pipeline {} by {} ({})",
            run.run_number,
            run.id,
            run.pipeline_id,
            run.trigger_by,
            run.trigger
        );

        if let Some(delay) = self.auto_start_delay {
            self.schedule_start(run.id, delay);
        }

        Ok(run)
    }

    /// Start a pipeline by hand, snapshotting its current definition
    pub async fn trigger_manual(
        &self,
        pipelines: &dyn PipelineStore,
        pipeline_id: Uuid,
        trigger_by: String,
    ) -> Result<PipelineRun> {
        let pipeline = pipelines
            .find_by_id(pipeline_id)
            .await?
            .ok_or(RunError::PipelineNotFound(pipeline_id))?;

        self.create_run(NewRun {
            pipeline_id,
            trigger: RunTrigger::Manual,
            trigger_by,
            pipeline_snapshot: pipeline.content,
            webhook_data: None,
        })
        .await
    }

    /// Apply a status change; `None` if the run does not exist
    pub async fn update_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        update: RunUpdate,
    ) -> Result<Option<PipelineRun>> {
        let run = self.runs.update_status(run_id, status, update).await?;

        if let Some(run) = &run {
            tracing::debug!("Run {} is now {}", run.id, run.status);
        }

        Ok(run)
    }

    /// The executor picked the run up
    pub async fn on_run_started(&self, run_id: Uuid) -> Result<PipelineRun> {
        let run = self
            .update_status(run_id, RunStatus::Running, RunUpdate::default())
            .await?
            .ok_or(RunError::NotFound(run_id))?;

        tracing::info!("Run {} started", run_id);

        Ok(run)
    }

    /// The executor finished the run
    pub async fn on_run_completed(
        &self,
        run_id: Uuid,
        status: RunStatus,
        update: RunUpdate,
    ) -> Result<PipelineRun> {
        validate_completion_status(status)?;

        let run = self
            .update_status(run_id, status, update)
            .await?
            .ok_or(RunError::NotFound(run_id))?;

        tracing::info!(
            "Run {} completed with status {} after {}s",
            run_id,
            run.status,
            run.duration.unwrap_or_default()
        );

        Ok(run)
    }

    /// Fire-and-forget start after `delay`. A run that already left `queued`
    /// by then is left alone.
    fn schedule_start(&self, run_id: Uuid, delay: Duration) {
        let runs = self.runs.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let current = match runs.find_by_id(run_id).await {
                Ok(Some(run)) => run,
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!("Auto-start of run {} failed: {}", run_id, e);
                    return;
                }
            };
            if current.status != RunStatus::Queued {
                return;
            }

            match runs
                .update_status(run_id, RunStatus::Running, RunUpdate::default())
                .await
            {
                Ok(_) => tracing::debug!("Run {} auto-started", run_id),
                Err(StoreError::InvalidTransition(e)) => {
                    tracing::debug!("Auto-start of run {} skipped: {}", run_id, e)
                }
                Err(e) => tracing::warn!("Auto-start of run {} failed: {}", run_id, e),
            }
        });
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_completion_status(status: RunStatus) -> Result<()> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(RunError::ValidationError(format!(
            "Invalid completion status: {}",
            status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryPipelineStore, InMemoryRunStore};
    use otto_core::dto::pipeline::CreatePipeline;

    fn ledger() -> RunLedger {
        RunLedger::new(Arc::new(InMemoryRunStore::new()))
    }

    fn new_run(pipeline_id: Uuid) -> NewRun {
        NewRun {
            pipeline_id,
            trigger: RunTrigger::Manual,
            trigger_by: "user-1".to_string(),
            pipeline_snapshot: r#"{"blocks":[]}"#.to_string(),
            webhook_data: None,
        }
    }

    #[test]
    fn test_validate_completion_status() {
        assert!(validate_completion_status(RunStatus::Success).is_ok());
        assert!(validate_completion_status(RunStatus::Failed).is_ok());
        assert!(validate_completion_status(RunStatus::Cancelled).is_ok());
        assert!(validate_completion_status(RunStatus::Queued).is_err());
        assert!(validate_completion_status(RunStatus::Running).is_err());
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let ledger = ledger();
        let run = ledger.create_run(new_run(Uuid::new_v4())).await.unwrap();
        assert_eq!(run.status, RunStatus::Queued);

        let run = ledger.on_run_started(run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Running);

        let run = ledger
            .on_run_completed(
                run.id,
                RunStatus::Success,
                RunUpdate {
                    logs_url: None,
                    result_message: Some("ok".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::Success);
        assert!(run.completed_at.is_some());
        assert_eq!(run.result_message.as_deref(), Some("ok"));

        let err = ledger.on_run_started(run.id).await.unwrap_err();
        assert!(matches!(err, RunError::InvalidTransition(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unknown_run() {
        let ledger = ledger();
        let id = Uuid::new_v4();
        assert!(
            ledger
                .update_status(id, RunStatus::Failed, RunUpdate::default())
                .await
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            ledger.on_run_started(id).await,
            Err(RunError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_trigger_origin_rejected() {
        let mut new = new_run(Uuid::new_v4());
        new.trigger_by = String::new();
        assert!(matches!(
            ledger().create_run(new).await,
            Err(RunError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_manual_trigger_snapshots_current_content() {
        let pipelines = InMemoryPipelineStore::new();
        let pipeline = pipelines
            .create(CreatePipeline {
                project_id: "proj-1".to_string(),
                name: "build".to_string(),
                content: r#"{"blocks":[{"id":"v1"}]}"#.to_string(),
            })
            .await
            .unwrap();

        let ledger = ledger();
        let run = ledger
            .trigger_manual(&pipelines, pipeline.id, "user-1".to_string())
            .await
            .unwrap();
        assert_eq!(run.trigger, RunTrigger::Manual);
        assert_eq!(run.pipeline_snapshot, pipeline.content);

        let missing = ledger
            .trigger_manual(&pipelines, Uuid::new_v4(), "user-1".to_string())
            .await;
        assert!(matches!(missing, Err(RunError::PipelineNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_start_after_delay() {
        let runs = Arc::new(InMemoryRunStore::new());
        let ledger =
            RunLedger::new(runs.clone()).with_auto_start(Some(Duration::from_millis(2000)));

        let run = ledger.create_run(new_run(Uuid::new_v4())).await.unwrap();
        assert_eq!(run.status, RunStatus::Queued);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        tokio::task::yield_now().await;

        let stored = runs.find_by_id(run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_start_leaves_finished_runs_alone() {
        let runs = Arc::new(InMemoryRunStore::new());
        let ledger =
            RunLedger::new(runs.clone()).with_auto_start(Some(Duration::from_millis(2000)));

        let run = ledger.create_run(new_run(Uuid::new_v4())).await.unwrap();
        ledger
            .on_run_completed(run.id, RunStatus::Cancelled, RunUpdate::default())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2100)).await;
        tokio::task::yield_now().await;

        let stored = runs.find_by_id(run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Cancelled);
    }
}
