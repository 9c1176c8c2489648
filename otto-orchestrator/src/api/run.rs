//! Run API Handlers
//!
//! HTTP endpoints for triggering runs, reading the run ledger and receiving
//! executor lifecycle events.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use otto_core::domain::run::PipelineRun;
use otto_core::dto::run::{CompleteRun, PageRequest, RunPage, TriggerRun};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::service::query_service;
use crate::state::AppState;

// =============================================================================
// Triggering
// =============================================================================

/// POST /pipelines/{id}/runs
/// Start a pipeline by hand
pub async fn trigger_run(
    State(state): State<AppState>,
    Path(pipeline_id): Path<Uuid>,
    Json(req): Json<TriggerRun>,
) -> ApiResult<(StatusCode, Json<PipelineRun>)> {
    tracing::info!(
        "Manual run requested for pipeline {} by {}",
        pipeline_id,
        req.trigger_by
    );

    let run = state
        .ledger
        .trigger_manual(state.pipelines.as_ref(), pipeline_id, req.trigger_by)
        .await?;

    Ok((StatusCode::CREATED, Json(run)))
}

// =============================================================================
// Queries
// =============================================================================

/// Query parameters for listing runs
#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// GET /pipelines/{id}/runs
/// List a pipeline's runs, most recently started first
///
/// Query parameters:
/// - `page` (optional, default 1)
/// - `limit` (optional, default 20, at most 100)
pub async fn list_runs(
    State(state): State<AppState>,
    Path(pipeline_id): Path<Uuid>,
    Query(params): Query<ListRunsQuery>,
) -> ApiResult<Json<RunPage>> {
    let page = PageRequest::new(params.page, params.limit);

    let runs = query_service::list_runs(state.runs.as_ref(), pipeline_id, page).await?;

    Ok(Json(runs))
}

/// GET /pipelines/{id}/runs/latest
/// Get the most recently started run
pub async fn get_latest_run(
    State(state): State<AppState>,
    Path(pipeline_id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    let run = query_service::get_latest_run(state.runs.as_ref(), pipeline_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Pipeline {} has no runs", pipeline_id)))?;

    Ok(Json(run))
}

/// GET /runs/{id}
/// Get run details by ID
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    tracing::debug!("Getting run: {}", id);

    let run = query_service::get_run(state.runs.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Run {} not found", id)))?;

    Ok(Json(run))
}

// =============================================================================
// Executor Events
// =============================================================================

/// POST /runs/{id}/start
/// The executor picked the run up
pub async fn start_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    let run = state.ledger.on_run_started(id).await?;

    Ok(Json(run))
}

/// POST /runs/{id}/complete
/// The executor finished the run
pub async fn complete_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteRun>,
) -> ApiResult<Json<PipelineRun>> {
    tracing::info!("Completing run {} with status {}", id, req.status);

    let run = state
        .ledger
        .on_run_completed(id, req.status, req.update)
        .await?;

    Ok(Json(run))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::api::test_support::server;
    use crate::config::Config;

    async fn create_pipeline(server: &TestServer) -> String {
        let created: Value = server
            .post("/pipelines")
            .json(&json!({
                "projectId": "proj-1",
                "name": "build",
                "content": r#"{"blocks":[{"id":"v1"}]}"#
            }))
            .await
            .json();
        created["id"].as_str().unwrap().to_string()
    }

    async fn trigger(server: &TestServer, pipeline_id: &str) -> Value {
        let response = server
            .post(&format!("/pipelines/{}/runs", pipeline_id))
            .json(&json!({ "triggerBy": "user-7" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    #[tokio::test]
    async fn test_manual_runs_are_numbered() {
        let (server, _) = server(&Config::default());
        let pipeline_id = create_pipeline(&server).await;

        for expected in 1..=3 {
            let run = trigger(&server, &pipeline_id).await;
            assert_eq!(run["runNumber"], expected);
            assert_eq!(run["status"], "queued");
            assert_eq!(run["trigger"], "manual");
            assert_eq!(run["triggerBy"], "user-7");
        }

        let latest: Value = server
            .get(&format!("/pipelines/{}/runs/latest", pipeline_id))
            .await
            .json();
        assert_eq!(latest["runNumber"], 3);
    }

    #[tokio::test]
    async fn test_pagination() {
        let (server, _) = server(&Config::default());
        let pipeline_id = create_pipeline(&server).await;
        for _ in 0..5 {
            trigger(&server, &pipeline_id).await;
        }

        let response = server
            .get(&format!("/pipelines/{}/runs", pipeline_id))
            .add_query_param("page", 2)
            .add_query_param("limit", 2)
            .await;
        response.assert_status_ok();
        let page: Value = response.json();
        let numbers: Vec<_> = page["runs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["runNumber"].as_u64().unwrap())
            .collect();
        assert_eq!(numbers, vec![3, 2]);
        assert_eq!(page["total"], 5);
        assert_eq!(page["page"], 2);
        assert_eq!(page["limit"], 2);
    }

    #[tokio::test]
    async fn test_executor_lifecycle() {
        let (server, _) = server(&Config::default());
        let pipeline_id = create_pipeline(&server).await;
        let run = trigger(&server, &pipeline_id).await;
        let run_id = run["id"].as_str().unwrap();

        let started: Value = server
            .post(&format!("/runs/{}/start", run_id))
            .await
            .json();
        assert_eq!(started["status"], "running");

        let response = server
            .post(&format!("/runs/{}/complete", run_id))
            .json(&json!({ "status": "failed", "resultMessage": "exit 2" }))
            .await;
        response.assert_status_ok();
        let completed: Value = response.json();
        assert_eq!(completed["status"], "failed");
        assert_eq!(completed["resultMessage"], "exit 2");
        assert!(completed["completedAt"].is_string());
        assert!(completed["duration"].is_u64());

        // Resending the same completion is accepted and changes nothing
        let again: Value = server
            .post(&format!("/runs/{}/complete", run_id))
            .json(&json!({ "status": "failed" }))
            .await
            .json();
        assert_eq!(again["completedAt"], completed["completedAt"]);

        server
            .post(&format!("/runs/{}/start", run_id))
            .await
            .assert_status(StatusCode::CONFLICT);

        let fetched: Value = server.get(&format!("/runs/{}", run_id)).await.json();
        assert_eq!(fetched["pipelineSnapshot"], r#"{"blocks":[{"id":"v1"}]}"#);
    }

    #[tokio::test]
    async fn test_editing_pipeline_keeps_run_snapshot() {
        let (server, _) = server(&Config::default());
        let pipeline_id = create_pipeline(&server).await;
        let run = trigger(&server, &pipeline_id).await;

        server
            .put(&format!("/pipelines/{}", pipeline_id))
            .json(&json!({ "content": r#"{"blocks":[{"id":"v2"}]}"# }))
            .await
            .assert_status_ok();

        let fetched: Value = server
            .get(&format!("/runs/{}", run["id"].as_str().unwrap()))
            .await
            .json();
        assert_eq!(fetched["pipelineSnapshot"], r#"{"blocks":[{"id":"v1"}]}"#);

        let next = trigger(&server, &pipeline_id).await;
        assert_eq!(next["pipelineSnapshot"], r#"{"blocks":[{"id":"v2"}]}"#);
    }

    #[tokio::test]
    async fn test_non_terminal_completion_rejected() {
        let (server, _) = server(&Config::default());
        let pipeline_id = create_pipeline(&server).await;
        let run = trigger(&server, &pipeline_id).await;

        server
            .post(&format!("/runs/{}/complete", run["id"].as_str().unwrap()))
            .json(&json!({ "status": "running" }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_missing_resources() {
        let (server, _) = server(&Config::default());
        let unknown = uuid::Uuid::new_v4();

        server
            .get(&format!("/runs/{}", unknown))
            .await
            .assert_status_not_found();
        server
            .get(&format!("/pipelines/{}/runs/latest", unknown))
            .await
            .assert_status_not_found();
        server
            .post(&format!("/runs/{}/start", unknown))
            .await
            .assert_status_not_found();
        server
            .post(&format!("/pipelines/{}/runs", unknown))
            .json(&json!({ "triggerBy": "user-7" }))
            .await
            .assert_status_not_found();
    }
}
