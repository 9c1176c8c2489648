//! Log Service
//!
//! Business logic for run log management.

use otto_core::domain::log::{LogLevel, LogLine};
use otto_core::dto::log::LogView;
use otto_core::logview::LogViewer;
use uuid::Uuid;

use crate::repository::{LogStore, RunStore, StoreError};

const MAX_MESSAGE_LENGTH: usize = 10_000;
const MAX_BATCH_SIZE: usize = 1000;

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("run {0} not found")]
    RunNotFound(Uuid),

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LogError {
    pub fn is_retryable(&self) -> bool {
        match self {
            LogError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LogError>;

/// Add log lines for a run
pub async fn add_log_lines(
    runs: &dyn RunStore,
    logs: &dyn LogStore,
    run_id: Uuid,
    lines: Vec<LogLine>,
) -> Result<()> {
    validate_log_lines(&lines)?;

    if lines.is_empty() {
        return Ok(());
    }

    ensure_run_exists(runs, run_id).await?;

    let count = lines.len();
    logs.append(run_id, lines).await?;

    tracing::debug!("Added {} log lines for run: {}", count, run_id);

    Ok(())
}

/// Get all log lines for a run
pub async fn get_run_logs(
    runs: &dyn RunStore,
    logs: &dyn LogStore,
    run_id: Uuid,
) -> Result<Vec<LogLine>> {
    ensure_run_exists(runs, run_id).await?;
    Ok(logs.find_by_run(run_id).await?)
}

/// Get a run's logs filtered by level and searched for `search`.
///
/// `levels` of `None` keeps every level.
pub async fn view_logs(
    runs: &dyn RunStore,
    logs: &dyn LogStore,
    run_id: Uuid,
    levels: Option<Vec<LogLevel>>,
    search: Option<String>,
) -> Result<LogView> {
    let lines = get_run_logs(runs, logs, run_id).await?;
    Ok(build_view(lines, levels, search.as_deref()))
}

fn build_view(
    lines: Vec<LogLine>,
    levels: Option<Vec<LogLevel>>,
    search: Option<&str>,
) -> LogView {
    let total = lines.len();
    let mut viewer = LogViewer::new(lines);

    if let Some(levels) = levels {
        viewer.set_levels(levels);
    }
    if let Some(query) = search {
        viewer.search_now(query);
    }

    LogView {
        lines: viewer.filtered_logs().cloned().collect(),
        matches: viewer
            .search_results()
            .iter()
            .map(|r| r.line_number)
            .collect(),
        total,
    }
}

async fn ensure_run_exists(runs: &dyn RunStore, run_id: Uuid) -> Result<()> {
    match runs.find_by_id(run_id).await? {
        Some(_) => Ok(()),
        None => Err(LogError::RunNotFound(run_id)),
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_log_lines(lines: &[LogLine]) -> Result<()> {
    if lines.len() > MAX_BATCH_SIZE {
        return Err(LogError::ValidationError(format!(
            "Too many log lines in batch (max: {})",
            MAX_BATCH_SIZE
        )));
    }

    for (i, line) in lines.iter().enumerate() {
        if line.message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(LogError::ValidationError(format!(
                "Log line {} message too long (max: {} chars)",
                i, MAX_MESSAGE_LENGTH
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryLogStore, InMemoryRunStore};
    use otto_core::domain::run::{NewRun, RunTrigger};

    fn line(level: LogLevel, message: &str) -> LogLine {
        LogLine {
            timestamp: chrono::Utc::now(),
            level,
            message: message.to_string(),
            source: None,
        }
    }

    #[test]
    fn test_validate_log_lines_valid() {
        let lines = vec![
            line(LogLevel::Info, "Test message"),
            line(LogLevel::Error, "Error message"),
        ];
        assert!(validate_log_lines(&lines).is_ok());
    }

    #[test]
    fn test_validate_log_lines_too_many() {
        let lines: Vec<LogLine> = (0..1001)
            .map(|i| line(LogLevel::Info, &format!("Message {}", i)))
            .collect();

        let result = validate_log_lines(&lines);
        assert!(matches!(result, Err(LogError::ValidationError(_))));
    }

    #[test]
    fn test_validate_log_lines_message_too_long() {
        let lines = vec![line(LogLevel::Info, &"x".repeat(10_001))];

        let result = validate_log_lines(&lines);
        assert!(matches!(result, Err(LogError::ValidationError(_))));
    }

    #[test]
    fn test_build_view_filters_then_searches() {
        let lines = vec![
            line(LogLevel::Info, "step build started"),
            line(LogLevel::Debug, "build cache miss"),
            line(LogLevel::Error, "build failed"),
        ];

        let view = build_view(
            lines,
            Some(vec![LogLevel::Info, LogLevel::Error]),
            Some("BUILD"),
        );
        assert_eq!(view.total, 3);
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.matches, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_logs_require_existing_run() {
        let runs = InMemoryRunStore::new();
        let logs = InMemoryLogStore::new();

        let missing = add_log_lines(
            &runs,
            &logs,
            Uuid::new_v4(),
            vec![line(LogLevel::Info, "hello")],
        )
        .await;
        assert!(matches!(missing, Err(LogError::RunNotFound(_))));

        let run = runs
            .create_next(NewRun {
                pipeline_id: Uuid::new_v4(),
                trigger: RunTrigger::Manual,
                trigger_by: "user-1".to_string(),
                pipeline_snapshot: r#"{"blocks":[]}"#.to_string(),
                webhook_data: None,
            })
            .await
            .unwrap();

        add_log_lines(&runs, &logs, run.id, vec![line(LogLevel::Info, "hello")])
            .await
            .unwrap();

        let view = view_logs(&runs, &logs, run.id, None, Some("hel".to_string()))
            .await
            .unwrap();
        assert_eq!(view.total, 1);
        assert_eq!(view.matches, vec![0]);
    }
}
