//! Pipeline DTOs

use serde::{Deserialize, Serialize};

/// Request to store a new pipeline definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipeline {
    pub project_id: String,
    pub name: String,
    /// JSON document with a `blocks` array
    pub content: String,
}

/// Request to edit a stored pipeline definition
///
/// Editing never touches snapshots already captured by runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
