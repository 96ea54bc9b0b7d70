//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use kemi_services::PollerState;
use serde::Serialize;

use crate::AppState;

/// Gainers poller as seen by the health check
#[derive(Debug, Serialize)]
struct PollerHealth {
    running: bool,
    provider: String,
    status: PollerState,
    sequence: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    gainers_poller: PollerHealth,
    ai_enabled: bool,
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let snapshot = state.poller.snapshot();
    let running = state.poller.is_running();

    let status = if running { "healthy" } else { "degraded" };

    let response = HealthResponse {
        status: status.to_string(),
        gainers_poller: PollerHealth {
            running,
            provider: state.poller.provider_name().to_string(),
            status: snapshot.status,
            sequence: snapshot.sequence,
        },
        ai_enabled: state.analysis.ai_enabled(),
    };

    let code = if running {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(response))
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{get, json_body, send, state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_follows_poller() {
        let state = state(Some(vec![]), 10);

        let response = send(state.clone(), get("/api/health")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["gainers_poller"]["provider"], "stub");
        assert_eq!(body["ai_enabled"], false);

        state.poller.start();
        let response = send(state.clone(), get("/api/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["gainers_poller"]["running"], true);
        state.poller.stop();
    }

    #[tokio::test]
    async fn test_liveness() {
        let response = send(state(None, 10), get("/api/health/live")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
