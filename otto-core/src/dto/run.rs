//! Run DTOs

use serde::{Deserialize, Serialize};

use crate::domain::run::{PipelineRun, RunStatus, RunUpdate};

/// Default page size for run listings
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page size a caller may request
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Request to start a pipeline by hand
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRun {
    /// User id or system name recorded on the run
    pub trigger_by: String,
}

/// Terminal (or intermediate) status reported by the executor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRun {
    pub status: RunStatus,
    #[serde(flatten)]
    pub update: RunUpdate,
}

/// One page of a pipeline's runs, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPage {
    pub runs: Vec<PipelineRun>,
    /// Number of runs the pipeline has in total
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Paging parameters, normalised so that `page >= 1` and
/// `1 <= limit <= MAX_PAGE_LIMIT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Number of items to skip
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let page = PageRequest::default();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_request_normalises_bounds() {
        let page = PageRequest::new(Some(0), Some(0));
        assert_eq!((page.page, page.limit), (1, 1));

        let page = PageRequest::new(Some(3), Some(500));
        assert_eq!(page.limit, MAX_PAGE_LIMIT);
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn test_complete_run_flattens_update() {
        let req: CompleteRun =
            serde_json::from_str(r#"{"status":"failed","resultMessage":"exit 1"}"#).unwrap();
        assert_eq!(req.status, RunStatus::Failed);
        assert_eq!(req.update.result_message.as_deref(), Some("exit 1"));
        assert!(req.update.logs_url.is_none());
    }
}
