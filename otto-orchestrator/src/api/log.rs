//! Run Log API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use otto_core::domain::log::{LogLevel, LogLine};
use otto_core::dto::log::LogView;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::service::log_service;
use crate::state::AppState;

/// Query parameters for reading logs
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    /// Comma separated levels to keep, e.g. `INFO,ERROR`
    pub levels: Option<String>,
    /// Literal, case-insensitive search
    pub search: Option<String>,
}

/// GET /runs/{id}/logs
/// Get a run's logs, filtered by level and searched
pub async fn get_run_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<LogQuery>,
) -> ApiResult<Json<LogView>> {
    tracing::debug!("Getting logs for run: {}", id);

    // An empty level list means no filter, not "hide everything"
    let levels = params
        .levels
        .as_deref()
        .map(parse_levels)
        .transpose()?
        .filter(|levels| !levels.is_empty());

    let view = log_service::view_logs(
        state.runs.as_ref(),
        state.logs.as_ref(),
        id,
        levels,
        params.search,
    )
    .await?;

    Ok(Json(view))
}

/// POST /runs/{id}/logs
/// Append log lines reported by the executor
pub async fn add_run_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(lines): Json<Vec<LogLine>>,
) -> ApiResult<StatusCode> {
    log_service::add_log_lines(state.runs.as_ref(), state.logs.as_ref(), id, lines).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn parse_levels(raw: &str) -> ApiResult<Vec<LogLevel>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<LogLevel>().map_err(ApiError::BadRequest))
        .collect()
}
