//! GitHub Webhook API Handlers
//!
//! The body is taken raw: the signature covers the exact bytes GitHub sent.

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::HeaderMap,
};
use otto_core::dto::webhook::{WebhookInfo, WebhookResponse};
use otto_core::github::{DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER};

use crate::api::error::{ApiError, ApiResult};
use crate::service::webhook_service::{self, Delivery};
use crate::state::AppState;

/// Largest delivery GitHub sends (25 MB); axum's default limit is 2 MB
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// POST /webhooks/github
/// Receive a GitHub delivery and trigger the bound pipeline on push
pub async fn receive_github(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<WebhookResponse>> {
    let body = body.map_err(|rejection| ApiError::Detailed {
        status: rejection.status(),
        error: "invalid payload",
        details: rejection.body_text(),
    })?;

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let delivery = Delivery {
        event: header(EVENT_HEADER),
        delivery_id: header(DELIVERY_HEADER),
        signature: header(SIGNATURE_HEADER),
        body: &body,
    };

    tracing::debug!(
        "Webhook delivery {} ({} bytes, event {:?})",
        delivery.delivery_id.unwrap_or("-"),
        body.len(),
        delivery.event
    );

    let response = webhook_service::receive(&state, delivery).await?;

    Ok(Json(response))
}

/// GET /webhooks/github
/// Describe the endpoint
pub async fn webhook_info() -> Json<WebhookInfo> {
    Json(WebhookInfo {
        message: "GitHub webhook endpoint for triggering pipeline runs on push".to_string(),
        endpoint: "/webhooks/github".to_string(),
        methods: vec!["POST".to_string()],
    })
}
