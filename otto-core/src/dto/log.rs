//! Log DTOs

use serde::{Deserialize, Serialize};

use crate::domain::log::LogLine;

/// Filtered view of a run's logs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogView {
    /// Lines whose level is enabled, in document order
    pub lines: Vec<LogLine>,
    /// Positions within `lines` that match the search query
    pub matches: Vec<usize>,
    /// Number of lines before level filtering
    pub total: usize,
}
