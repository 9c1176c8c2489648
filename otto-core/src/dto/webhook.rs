//! Webhook response DTOs
//!
//! Bodies returned to GitHub (and visible in its delivery log) by
//! `/webhooks/github`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::binding::WebhookBinding;
use crate::domain::run::{PipelineRun, RunTrigger, WebhookTriggerData};
use crate::github::short_sha;

/// Body of a 200 response to a webhook delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    /// Present only when a run was created (or replayed from a duplicate)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<WebhookRunData>,
}

/// Details of the run a push created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRunData {
    pub pipeline_id: Uuid,
    pub run_id: Uuid,
    pub run_number: u32,
    pub project_id: String,
    pub repository: String,
    pub branch: String,
    /// Seven character short SHA
    pub commit: String,
    pub commit_message: String,
    pub author: String,
    pub webhook_config: WebhookConfigEcho,
    pub execution: ExecutionEcho,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfigEcho {
    pub trigger_branch: String,
    pub github_repo_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEcho {
    pub trigger: RunTrigger,
    pub started_at: DateTime<Utc>,
}

/// Body of `GET /webhooks/github`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookInfo {
    pub message: String,
    pub endpoint: String,
    pub methods: Vec<String>,
}

impl WebhookResponse {
    /// Acknowledges a delivery that does not trigger anything
    pub fn ignored(event: &str) -> Self {
        Self {
            success: true,
            message: format!("Event '{}' ignored", event),
            data: None,
        }
    }

    pub fn triggered(data: WebhookRunData) -> Self {
        Self {
            success: true,
            message: format!("Pipeline run #{} triggered", data.run_number),
            data: Some(data),
        }
    }

    pub fn duplicate(data: WebhookRunData) -> Self {
        Self {
            success: true,
            message: format!("Duplicate delivery, run #{} already exists", data.run_number),
            data: Some(data),
        }
    }
}

impl WebhookRunData {
    /// Builds the response echo for a run triggered by `push`
    pub fn from_run(
        run: &PipelineRun,
        binding: &WebhookBinding,
        push: &WebhookTriggerData,
    ) -> Self {
        Self {
            pipeline_id: run.pipeline_id,
            run_id: run.id,
            run_number: run.run_number,
            project_id: binding.project_id.clone(),
            repository: push.repository.clone(),
            branch: push.branch.clone(),
            commit: short_sha(&push.commit).to_string(),
            commit_message: push.commit_message.clone(),
            author: push.author.clone(),
            webhook_config: WebhookConfigEcho {
                trigger_branch: binding.trigger_branch.clone(),
                github_repo_name: binding.github_repo_name.clone(),
            },
            execution: ExecutionEcho {
                trigger: run.trigger,
                started_at: run.started_at,
            },
        }
    }
}
