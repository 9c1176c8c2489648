//! Pipeline definition endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use otto_core::domain::pipeline::PipelineDefinition;
use otto_core::dto::pipeline::{CreatePipeline, UpdatePipeline};
use uuid::Uuid;

impl OrchestratorClient {
    // =============================================================================
    // Pipeline Management
    // =============================================================================

    /// Store a new pipeline definition
    ///
    /// # Example
    /// ```no_run
    /// # use otto_client::OrchestratorClient;
    /// # use otto_core::dto::pipeline::CreatePipeline;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = OrchestratorClient::new("http://localhost:8080");
    /// let pipeline = client.create_pipeline(CreatePipeline {
    ///     project_id: "proj-1".to_string(),
    ///     name: "build".to_string(),
    ///     content: r#"{"blocks":[]}"#.to_string(),
    /// }).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_pipeline(&self, req: CreatePipeline) -> Result<PipelineDefinition> {
        let response = self
            .client
            .post(self.url("/pipelines"))
            .json(&req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List all pipelines
    pub async fn list_pipelines(&self) -> Result<Vec<PipelineDefinition>> {
        let response = self.client.get(self.url("/pipelines")).send().await?;

        self.handle_response(response).await
    }

    /// Get a pipeline by ID
    pub async fn get_pipeline(&self, pipeline_id: Uuid) -> Result<PipelineDefinition> {
        let url = self.url(&format!("/pipelines/{}", pipeline_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Edit a pipeline's name or content
    ///
    /// Runs already triggered keep the snapshot they captured.
    pub async fn update_pipeline(
        &self,
        pipeline_id: Uuid,
        req: UpdatePipeline,
    ) -> Result<PipelineDefinition> {
        let url = self.url(&format!("/pipelines/{}", pipeline_id));
        let response = self.client.put(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Delete a pipeline
    pub async fn delete_pipeline(&self, pipeline_id: Uuid) -> Result<()> {
        let url = self.url(&format!("/pipelines/{}", pipeline_id));
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
