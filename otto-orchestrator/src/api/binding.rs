//! Webhook Binding API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use otto_core::domain::binding::WebhookBinding;
use otto_core::dto::binding::{ConnectBinding, DisableBindingResponse};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::binding_service;
use crate::state::AppState;

/// POST /bindings
/// Connect a pipeline to a repository branch
pub async fn connect_binding(
    State(state): State<AppState>,
    Json(req): Json<ConnectBinding>,
) -> ApiResult<Json<WebhookBinding>> {
    tracing::info!(
        "Connecting pipeline {} to {} branch '{}'",
        req.pipeline_id,
        req.github_repo_name,
        req.trigger_branch
    );

    let binding =
        binding_service::connect(state.bindings.as_ref(), req, state.conflict_policy).await?;

    Ok(Json(binding))
}

/// POST /pipelines/{id}/bindings/disable
/// Stop a pipeline from being triggered by pushes
pub async fn disable_bindings(
    State(state): State<AppState>,
    Path(pipeline_id): Path<Uuid>,
) -> ApiResult<Json<DisableBindingResponse>> {
    let disabled = binding_service::disable(state.bindings.as_ref(), pipeline_id).await?;

    Ok(Json(DisableBindingResponse {
        pipeline_id,
        disabled,
    }))
}

/// GET /projects/{project_id}/bindings
/// List a project's bindings, active or not
pub async fn list_project_bindings(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<WebhookBinding>>> {
    let bindings = binding_service::list_by_project(state.bindings.as_ref(), &project_id).await?;

    Ok(Json(bindings))
}
