//! Webhook binding DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::binding::DEFAULT_TRIGGER_BRANCH;

/// Request to connect a pipeline to a repository branch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectBinding {
    pub pipeline_id: Uuid,
    pub project_id: String,
    pub github_repo_id: i64,
    pub github_repo_name: String,
    #[serde(default = "default_trigger_branch")]
    pub trigger_branch: String,
}

fn default_trigger_branch() -> String {
    DEFAULT_TRIGGER_BRANCH.to_string()
}

/// Result of disabling a pipeline's bindings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisableBindingResponse {
    pub pipeline_id: Uuid,
    pub disabled: bool,
}
