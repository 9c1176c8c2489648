//! Webhook binding domain types
//!
//! A binding routes pushes on one GitHub repository branch to a pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Branch used when a binding is connected without an explicit branch
pub const DEFAULT_TRIGGER_BRANCH: &str = "main";

/// Association between a pipeline and a GitHub repository branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookBinding {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub project_id: String,

    /// Stable numeric GitHub repository id
    pub github_repo_id: i64,

    /// "owner/repo", display only
    pub github_repo_name: String,

    /// Matched exactly against the pushed branch, no wildcards
    pub trigger_branch: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_triggered_at: Option<DateTime<Utc>>,
}

impl WebhookBinding {
    /// Whether a push to `branch` of repository `repo_id` should be routed here
    pub fn matches(&self, repo_id: i64, branch: &str) -> bool {
        self.is_active && self.github_repo_id == repo_id && self.trigger_branch == branch
    }
}

/// What `connect` does when an active binding already exists for the same
/// repository and branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Keep both; the oldest active binding keeps winning lookups
    #[default]
    AllowMultiple,
    /// Deactivate the existing bindings, then add the new one
    Replace,
    /// Refuse to add the new binding
    Reject,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow-multiple" | "allow_multiple" => Ok(ConflictPolicy::AllowMultiple),
            "replace" => Ok(ConflictPolicy::Replace),
            "reject" => Ok(ConflictPolicy::Reject),
            other => Err(format!(
                "unknown binding conflict policy '{}' (expected allow-multiple, replace or reject)",
                other
            )),
        }
    }
}
