//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod binding;
pub mod error;
pub mod health;
pub mod log;
pub mod pipeline;
pub mod run;
pub mod webhook;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // GitHub webhooks
        .route(
            "/webhooks/github",
            post(webhook::receive_github)
                .get(webhook::webhook_info)
                .layer(DefaultBodyLimit::max(webhook::MAX_BODY_BYTES)),
        )
        // Pipeline endpoints
        .route(
            "/pipelines",
            post(pipeline::create_pipeline).get(pipeline::list_pipelines),
        )
        .route(
            "/pipelines/{id}",
            get(pipeline::get_pipeline)
                .put(pipeline::update_pipeline)
                .delete(pipeline::delete_pipeline),
        )
        .route(
            "/pipelines/{id}/runs",
            post(run::trigger_run).get(run::list_runs),
        )
        .route("/pipelines/{id}/runs/latest", get(run::get_latest_run))
        .route(
            "/pipelines/{id}/bindings/disable",
            post(binding::disable_bindings),
        )
        // Binding endpoints
        .route("/bindings", post(binding::connect_binding))
        .route(
            "/projects/{project_id}/bindings",
            get(binding::list_project_bindings),
        )
        // Run endpoints
        .route("/runs/{id}", get(run::get_run))
        .route("/runs/{id}/start", post(run::start_run))
        .route("/runs/{id}/complete", post(run::complete_run))
        .route(
            "/runs/{id}/logs",
            get(log::get_run_logs).post(log::add_run_logs),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum_test::TestServer;

    use super::create_router;
    use crate::config::Config;
    use crate::state::AppState;

    /// In-memory state and a test server routing to it
    pub fn server(config: &Config) -> (TestServer, AppState) {
        let state = AppState::in_memory(config);
        let server = TestServer::new(create_router(state.clone())).expect("test server");
        (server, state)
    }
}
