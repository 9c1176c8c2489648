//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::repository::StoreError;
use crate::service::binding::BindingError;
use crate::service::ledger::RunError;
use crate::service::log::LogError;
use crate::service::pipeline::PipelineError;
use crate::service::webhook::WebhookError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    /// Transient failure; the client may retry
    ServiceUnavailable(String),
    /// Fixed error label with a human readable reason
    Detailed {
        status: StatusCode,
        error: &'static str,
        details: String,
    },
    StoreError(StoreError),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, None),
            ApiError::Detailed {
                status,
                error,
                details,
            } => (status, error.to_string(), Some(details)),
            ApiError::StoreError(err) => {
                tracing::error!("Storage error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    None,
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RunNumberConflict(_) => ApiError::ServiceUnavailable(err.to_string()),
            StoreError::BindingConflict { .. } | StoreError::InvalidTransition(_) => {
                ApiError::Conflict(err.to_string())
            }
            other => ApiError::StoreError(other),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(id) => ApiError::NotFound(format!("Pipeline {} not found", id)),
            PipelineError::ValidationError(msg) => ApiError::BadRequest(msg),
            PipelineError::Store(e) => e.into(),
        }
    }
}

impl From<BindingError> for ApiError {
    fn from(err: BindingError) -> Self {
        match err {
            BindingError::ValidationError(msg) => ApiError::BadRequest(msg),
            BindingError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            BindingError::Store(e) => e.into(),
        }
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::NotFound(id) => ApiError::NotFound(format!("Run {} not found", id)),
            RunError::PipelineNotFound(id) => {
                ApiError::NotFound(format!("Pipeline {} not found", id))
            }
            RunError::ValidationError(msg) => ApiError::BadRequest(msg),
            RunError::InvalidTransition(e) => ApiError::Conflict(e.to_string()),
            RunError::NumberConflict(_) => ApiError::ServiceUnavailable(err.to_string()),
            RunError::Store(e) => e.into(),
        }
    }
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::RunNotFound(id) => ApiError::NotFound(format!("Run {} not found", id)),
            LogError::ValidationError(msg) => ApiError::BadRequest(msg),
            LogError::Store(e) => e.into(),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidSignature => {
                ApiError::Unauthorized("invalid signature".to_string())
            }
            WebhookError::InvalidPayload(details) => ApiError::Detailed {
                status: StatusCode::BAD_REQUEST,
                error: "invalid payload",
                details,
            },
            WebhookError::NoBinding { .. } => ApiError::Detailed {
                status: StatusCode::NOT_FOUND,
                error: "no binding",
                details: err.to_string(),
            },
            WebhookError::PipelineUnavailable { reason, .. } => ApiError::Detailed {
                status: StatusCode::NOT_FOUND,
                error: "cannot execute",
                details: reason,
            },
            WebhookError::Run(e) => e.into(),
            WebhookError::Binding(e) => e.into(),
            WebhookError::Store(e) => e.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use otto_core::domain::run::{RunStatus, TransitionError};
    use uuid::Uuid;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(WebhookError::InvalidSignature), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(WebhookError::InvalidPayload("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(WebhookError::NoBinding {
                repo_id: 1,
                branch: "main".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(RunError::InvalidTransition(TransitionError {
                from: RunStatus::Success,
                to: RunStatus::Running,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(RunError::NumberConflict(Uuid::new_v4())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(BindingError::Conflict {
                repo_id: 1,
                branch: "main".to_string()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::InternalError("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
