//! Pipeline domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline definition
///
/// `content` is the JSON document produced by the pipeline builder (an
/// object with a `blocks` array). Otto never interprets the blocks; it only
/// copies the document into each run as that run's snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDefinition {
    pub id: Uuid,
    pub project_id: String,
    pub name: String,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
