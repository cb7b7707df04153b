//! Error types for Study Companion
//!
//! All errors implement `IntoResponse` for Axum handlers.

use crate::store::StoreError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read configuration file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    /// The JSON body could not be read (syntax, content type or shape)
    #[error("Invalid request body: {message}")]
    InvalidBody { status: StatusCode, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Another request already holds the generation lock for this resource
    #[error("Busy: {0}")]
    Busy(String),

    #[error("Rate limit of {limit} requests per hour exceeded")]
    RateLimited { limit: u32 },

    /// The model provider is overloaded and no fallback was produced
    #[error("AI unavailable: {message}")]
    AiUnavailable { message: String, details: String },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg })),
            Self::InvalidBody { status, message } => {
                (*status, serde_json::json!({ "error": message }))
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, serde_json::json!({ "detail": msg })),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            Self::Busy(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                serde_json::json!({ "error": msg }),
            ),
            Self::RateLimited { limit } => (
                StatusCode::TOO_MANY_REQUESTS,
                serde_json::json!({
                    "error": "API rate limit exceeded. Please wait before making more requests.",
                    "limit": format!("{} requests per hour for AI features", limit),
                }),
            ),
            Self::AiUnavailable { message, details } => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "error": message,
                    "details": details,
                    "fallback_mode": true,
                }),
            ),
            Self::GenerationFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": msg }),
            ),
            Self::Store(StoreError::Conflict(msg)) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            Self::Store(e) => {
                tracing::error!(error = %e, "Storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "A storage error occurred. Please try again later." }),
                )
            }
            Self::Io(e) => {
                tracing::error!(error = %e, "I/O operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "A file error occurred. Please try again later." }),
                )
            }
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": self.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_validation_error_creates() {
        let err = AppError::Validation("invalid input".to_string());
        assert_eq!(err.to_string(), "Invalid request: invalid input");
    }

    #[test]
    fn test_validation_error_response_status() {
        let response = AppError::Validation("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_response_status() {
        let response = AppError::NotFound("Document not found.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_busy_response_status() {
        let response = AppError::Busy("already running".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_unauthorized_uses_detail_field() {
        let response = AppError::Unauthorized("Invalid token.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Invalid token.");
    }

    #[tokio::test]
    async fn test_rate_limited_body_names_limit() {
        let response = AppError::RateLimited { limit: 50 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(response).await;
        assert_eq!(body["limit"], "50 requests per hour for AI features");
        assert!(body["error"].as_str().unwrap().contains("rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_ai_unavailable_sets_fallback_mode() {
        let response = AppError::AiUnavailable {
            message: "AI summary is temporarily unavailable due to high demand.".to_string(),
            details: "try later".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["fallback_mode"], true);
        assert_eq!(body["details"], "try later");
    }

    #[tokio::test]
    async fn test_generation_failed_is_internal_error() {
        let response =
            AppError::GenerationFailed("Failed to generate summary.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to generate summary.");
    }

    #[tokio::test]
    async fn test_store_conflict_is_bad_request() {
        let response =
            AppError::from(StoreError::Conflict("name already exists".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "name already exists");
    }

    #[test]
    fn test_internal_error_response_status() {
        let response = AppError::Internal("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
