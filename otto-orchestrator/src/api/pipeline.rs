//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline definition management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use otto_core::domain::pipeline::PipelineDefinition;
use otto_core::dto::pipeline::{CreatePipeline, UpdatePipeline};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::pipeline_service;
use crate::state::AppState;

/// POST /pipelines
/// Create a new pipeline
pub async fn create_pipeline(
    State(state): State<AppState>,
    Json(req): Json<CreatePipeline>,
) -> ApiResult<(StatusCode, Json<PipelineDefinition>)> {
    tracing::info!("Creating pipeline: {}", req.name);

    let pipeline = pipeline_service::create_pipeline(state.pipelines.as_ref(), req).await?;

    Ok((StatusCode::CREATED, Json(pipeline)))
}

/// GET /pipelines
/// List all pipelines
pub async fn list_pipelines(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PipelineDefinition>>> {
    tracing::debug!("Listing all pipelines");

    let pipelines = pipeline_service::list_pipelines(state.pipelines.as_ref()).await?;

    Ok(Json(pipelines))
}

/// GET /pipelines/{id}
/// Get pipeline by ID
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineDefinition>> {
    tracing::debug!("Getting pipeline: {}", id);

    let pipeline = pipeline_service::get_pipeline(state.pipelines.as_ref(), id).await?;

    Ok(Json(pipeline))
}

/// PUT /pipelines/{id}
/// Update a pipeline's name and/or content
pub async fn update_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePipeline>,
) -> ApiResult<Json<PipelineDefinition>> {
    tracing::info!("Updating pipeline: {}", id);

    let pipeline = pipeline_service::update_pipeline(state.pipelines.as_ref(), id, req).await?;

    Ok(Json(pipeline))
}

/// DELETE /pipelines/{id}
/// Delete a pipeline
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting pipeline: {}", id);

    pipeline_service::delete_pipeline(state.pipelines.as_ref(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}
