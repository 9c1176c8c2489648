//! Run endpoints
//!
//! Manual triggering and ledger queries for the CLI, plus the lifecycle
//! events an executor reports while it works through a run.

use crate::OrchestratorClient;
use crate::error::Result;
use otto_core::domain::run::{PipelineRun, RunStatus, RunUpdate};
use otto_core::dto::run::{CompleteRun, RunPage, TriggerRun};
use uuid::Uuid;

impl OrchestratorClient {
    // =============================================================================
    // Triggering and Queries
    // =============================================================================

    /// Queue a run of the pipeline's current definition
    pub async fn trigger_run(&self, pipeline_id: Uuid, req: TriggerRun) -> Result<PipelineRun> {
        let url = self.url(&format!("/pipelines/{}/runs", pipeline_id));
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// List a pipeline's runs, newest first
    ///
    /// `page` and `limit` fall back to the server defaults when `None`.
    pub async fn list_runs(
        &self,
        pipeline_id: Uuid,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<RunPage> {
        let url = self.url(&format!("/pipelines/{}/runs", pipeline_id));
        let mut query = Vec::new();
        if let Some(page) = page {
            query.push(("page", page));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit));
        }
        let response = self.client.get(&url).query(&query).send().await?;

        self.handle_response(response).await
    }

    /// Get the pipeline's most recently started run
    pub async fn latest_run(&self, pipeline_id: Uuid) -> Result<PipelineRun> {
        let url = self.url(&format!("/pipelines/{}/runs/latest", pipeline_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get a run by ID
    pub async fn get_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        let url = self.url(&format!("/runs/{}", run_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Executor Events
    // =============================================================================

    /// Report that execution of a queued run began
    pub async fn start_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        let url = self.url(&format!("/runs/{}/start", run_id));
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    /// Report the run's terminal status
    ///
    /// Resending the status a run already ended with succeeds without
    /// changing it; any other status for a finished run is a conflict.
    pub async fn complete_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        update: RunUpdate,
    ) -> Result<PipelineRun> {
        let url = self.url(&format!("/runs/{}/complete", run_id));
        let response = self
            .client
            .post(&url)
            .json(&CompleteRun { status, update })
            .send()
            .await?;

        self.handle_response(response).await
    }
}
