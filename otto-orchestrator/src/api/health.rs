//! Health Check API Handler

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether webhook deliveries must carry a valid signature
    pub signature_required: bool,
    pub dedupe_enabled: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        signature_required: state.webhook_secret.is_some(),
        dedupe_enabled: state.deliveries.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::api::test_support::server;
    use crate::config::Config;

    #[tokio::test]
    async fn test_health() {
        let (open, _) = server(&Config::default());
        let response = open.get("/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["signatureRequired"], false);

        let config = Config {
            webhook_secret: Some("s3cret".to_string()),
            ..Config::default()
        };
        let (secured, _) = server(&config);
        let body: Value = secured.get("/health").await.json();
        assert_eq!(body["signatureRequired"], true);
    }
}
