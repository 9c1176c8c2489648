//! Run log endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use otto_core::domain::log::{LogLevel, LogLine};
use otto_core::dto::log::LogView;
use uuid::Uuid;

impl OrchestratorClient {
    /// Append lines to a run's log
    pub async fn add_logs(&self, run_id: Uuid, lines: &[LogLine]) -> Result<()> {
        let url = self.url(&format!("/runs/{}/logs", run_id));
        let response = self.client.post(&url).json(lines).send().await?;

        self.handle_empty_response(response).await
    }

    /// Read a run's log, keeping only `levels` (all when `None`) and
    /// marking lines that contain `search`
    pub async fn get_logs(
        &self,
        run_id: Uuid,
        levels: Option<&[LogLevel]>,
        search: Option<&str>,
    ) -> Result<LogView> {
        let url = self.url(&format!("/runs/{}/logs", run_id));
        let response = self
            .client
            .get(&url)
            .query(&log_query(levels, search))
            .send()
            .await?;

        self.handle_response(response).await
    }
}

fn log_query(levels: Option<&[LogLevel]>, search: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(levels) = levels {
        let joined = levels
            .iter()
            .map(LogLevel::as_str)
            .collect::<Vec<_>>()
            .join(",");
        query.push(("levels", joined));
    }
    if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
        query.push(("search", search.to_string()));
    }
    query
}
