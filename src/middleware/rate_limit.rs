//! Hourly per-user limit on AI endpoints

use super::auth::AuthUser;
use crate::error::AppError;
use crate::handlers::AppState;
use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Count authenticated requests to AI paths and reject those over the hourly limit
///
/// Must run after [`super::auth::auth_middleware`] so the caller is known.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(user_id) = request.extensions().get::<AuthUser>().map(|user| user.id) else {
        return next.run(request).await;
    };

    let limits = &state.config().limits;
    // Nested routers see a stripped URI; match against the full path
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    if !limits
        .rate_limited_paths
        .iter()
        .any(|fragment| path.contains(fragment.as_str()))
    {
        return next.run(request).await;
    }

    if let Err(exceeded) = state.caches().usage.hit(user_id, limits.ai_requests_per_hour) {
        state.metrics().rate_limited();
        tracing::warn!(
            user_id,
            path = %path,
            count = exceeded.count,
            limit = exceeded.limit,
            "Rate limit exceeded"
        );
        return AppError::RateLimited {
            limit: limits.ai_requests_per_hour,
        }
        .into_response();
    }

    let response = next.run(request).await;
    tracing::info!(
        user_id,
        path = %path,
        status = response.status().as_u16(),
        "AI API usage"
    );
    response
}
