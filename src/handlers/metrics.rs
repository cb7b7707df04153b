//! Prometheus metrics endpoint
//!
//! ```bash
//! curl http://localhost:8000/metrics
//! # HELP study_companion_ai_requests_total AI operations by outcome
//! # TYPE study_companion_ai_requests_total counter
//! study_companion_ai_requests_total{operation="summary",outcome="fallback"} 3
//! ```

use axum::{extract::State, http::StatusCode};

use crate::handlers::AppState;

pub async fn handler(State(state): State<AppState>) -> (StatusCode, String) {
    match state.metrics().gather() {
        Ok(output) => (StatusCode::OK, output),
        Err(e) => {
            tracing::error!(error = %e, "Failed to gather metrics for Prometheus scraping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to gather metrics: {}", e),
            )
        }
    }
}
