//! Webhook binding endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use otto_core::domain::binding::WebhookBinding;
use otto_core::dto::binding::{ConnectBinding, DisableBindingResponse};
use uuid::Uuid;

impl OrchestratorClient {
    /// Route pushes on a repository branch to a pipeline
    pub async fn connect_binding(&self, req: ConnectBinding) -> Result<WebhookBinding> {
        let response = self
            .client
            .post(self.url("/bindings"))
            .json(&req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Deactivate every binding of a pipeline
    pub async fn disable_bindings(&self, pipeline_id: Uuid) -> Result<DisableBindingResponse> {
        let url = self.url(&format!("/pipelines/{}/bindings/disable", pipeline_id));
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    /// List a project's bindings, including inactive ones
    pub async fn list_project_bindings(&self, project_id: &str) -> Result<Vec<WebhookBinding>> {
        let url = self.url(&format!("/projects/{}/bindings", project_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
