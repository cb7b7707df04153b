//! HTTP handlers and router assembly

use crate::ai::{GeminiClient, GenerativeModel, StudyAssistant};
use crate::cache::Caches;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::{auth_middleware, rate_limit_middleware, request_id_middleware};
use crate::store::Store;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRequest},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};

pub mod auth;
pub mod document_types;
pub mod documents;
pub mod health;
pub mod metrics;
pub mod search;
pub mod study;

/// JSON body extractor whose rejections use the `{"error": ...}` envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Application state shared across all handlers
///
/// All fields are Arc'd (the store wraps a pooled handle) for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Store,
    caches: Arc<Caches>,
    assistant: Arc<StudyAssistant>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Assemble state from already-open parts
    ///
    /// `model` is `None` when the service runs on fallbacks only.
    pub fn new(
        config: Arc<Config>,
        store: Store,
        model: Option<Arc<dyn GenerativeModel>>,
    ) -> AppResult<Self> {
        let metrics = Arc::new(
            Metrics::new()
                .map_err(|e| AppError::Internal(format!("Failed to initialize metrics: {}", e)))?,
        );
        let assistant = Arc::new(StudyAssistant::new(model, &config.ai, metrics.clone()));

        Ok(Self {
            config,
            store,
            caches: Arc::new(Caches::new()),
            assistant,
            metrics,
        })
    }

    /// Open the configured database and model client
    pub fn from_config(config: Arc<Config>) -> AppResult<Self> {
        let store = Store::open(&config.storage.database_path)?;
        let model = GeminiClient::from_config(&config.ai)
            .map_err(|e| AppError::Config(format!("Failed to build model client: {}", e)))?
            .map(|client| Arc::new(client) as Arc<dyn GenerativeModel>);
        Self::new(config, store, model)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn caches(&self) -> &Arc<Caches> {
        &self.caches
    }

    pub fn assistant(&self) -> &StudyAssistant {
        &self.assistant
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

/// JSON body for a panicking handler
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Unhandled panic in request handler");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": "An unexpected error occurred. Please try again later.",
            "status": "error",
        })),
    )
        .into_response()
}

fn api_routes(state: &AppState) -> Router<AppState> {
    let max_upload_bytes = state.config().server.max_upload_mb.saturating_mul(1024 * 1024);

    Router::new()
        .route(
            "/auth/validate-token/",
            get(auth::validate_token).post(auth::validate_token),
        )
        .route("/document-types/", get(document_types::list))
        .route("/document-types/create/", post(document_types::create))
        .route(
            "/document-types/{id}/",
            get(document_types::retrieve)
                .put(document_types::replace)
                .patch(document_types::update)
                .delete(document_types::destroy),
        )
        .route("/documents/", get(documents::list))
        .route("/documents/upload/", post(documents::upload))
        .route("/documents/search/", post(search::search))
        .route("/documents/search/suggestions/", post(search::suggestions))
        .route(
            "/documents/{id}/",
            get(documents::retrieve).delete(documents::destroy),
        )
        .route("/documents/{id}/summarize/", post(study::summarize))
        .route("/documents/{id}/generate-quiz/", post(study::generate_quiz))
        .route(
            "/documents/{id}/generate-flashcards/",
            post(study::generate_flashcards),
        )
        .route("/documents/{id}/qna/", post(study::answer_question))
        .route(
            "/documents/{id}/retry-extraction/",
            post(documents::retry_extraction),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        // Layers run bottom-up: authentication before rate limiting
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), auth_middleware))
}

/// The complete application router
pub fn router(state: AppState) -> Router {
    let config = state.config();
    let timeout = Duration::from_secs(config.server.request_timeout_seconds);

    let mut app = Router::new()
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .nest("/api", api_routes(&state));

    if config.storage.serve_media {
        app = app.nest_service("/media", ServeDir::new(&config.storage.media_root));
    }

    app.layer(TimeoutLayer::new(timeout))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn test_config() -> Config {
        let mut config: Config = r#"
[server]
host = "127.0.0.1"
port = 3000
"#
        .parse()
        .expect("test config should parse");
        config.ai.enabled = false;
        config
    }

    pub(crate) fn test_state() -> AppState {
        let store = Store::open_in_memory().expect("in-memory store");
        AppState::new(Arc::new(test_config()), store, None).expect("state")
    }
}
