//! Health check endpoint

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// "configured" when a model client exists, otherwise "fallback"
    pub ai_provider: &'static str,
    /// "operational" or "degraded" after repeated model failures
    pub ai_health: &'static str,
}

pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let assistant = state.assistant();
    let ai_provider = if assistant.is_configured() {
        "configured"
    } else {
        "fallback"
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            ai_provider,
            ai_health: assistant.health().state().await.as_str(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::test_state;

    #[tokio::test]
    async fn test_health_reports_fallback_mode() {
        let (status, Json(body)) = handler(State(test_state())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "OK");
        assert_eq!(body.ai_provider, "fallback");
        assert_eq!(body.ai_health, "operational");
    }

    #[tokio::test]
    async fn test_health_shows_degraded_provider() {
        let state = test_state();
        for _ in 0..3 {
            state.assistant().health().mark_failure().await;
        }
        let (_, Json(body)) = handler(State(state)).await;
        assert_eq!(body.ai_health, "degraded");
    }
}
