//! Token authentication
//!
//! Resolves `Authorization: Token <key>` (or `Bearer <key>`) to an active
//! user before the handlers run. Handlers that need a user take an
//! [`AuthUser`] argument; the extractor rejects unauthenticated requests.

use crate::error::AppError;
use crate::handlers::AppState;
use crate::store::users::{self, User};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub const NOT_PROVIDED: &str = "Authentication credentials were not provided.";
pub const INVALID_TOKEN: &str = "Invalid token.";
pub const INACTIVE_USER: &str = "User inactive or deleted.";
const MISSING_KEY: &str = "Invalid token header. No credentials provided.";
const SPACES_IN_KEY: &str = "Invalid token header. Token string should not contain spaces.";

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// Why credentials that were supplied were refused
#[derive(Debug, Clone, Copy)]
struct AuthFailure(&'static str);

/// Token key from the `Authorization` header
///
/// `None` when the header is absent or uses another scheme.
fn token_from_headers(headers: &HeaderMap) -> Option<Result<String, &'static str>> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    match (parts.next(), parts.next()) {
        (None, _) => Some(Err(MISSING_KEY)),
        (Some(_), Some(_)) => Some(Err(SPACES_IN_KEY)),
        (Some(key), None) => Some(Ok(key.to_string())),
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match token_from_headers(request.headers()) {
        None => {}
        Some(Err(reason)) => {
            request.extensions_mut().insert(AuthFailure(reason));
        }
        Some(Ok(key)) => {
            let lookup = state
                .store()
                .run(move |conn| users::user_for_token(conn, &key))
                .await;
            match lookup {
                Ok(Some(user)) if user.is_active => {
                    request.extensions_mut().insert(AuthUser::from(user));
                }
                Ok(Some(user)) => {
                    tracing::debug!(user_id = user.id, "Token belongs to an inactive user");
                    request.extensions_mut().insert(AuthFailure(INACTIVE_USER));
                }
                Ok(None) => {
                    request.extensions_mut().insert(AuthFailure(INVALID_TOKEN));
                }
                Err(e) => return AppError::from(e).into_response(),
            }
        }
    }

    next.run(request).await
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }
        let reason = parts
            .extensions
            .get::<AuthFailure>()
            .map_or(NOT_PROVIDED, |failure| failure.0);
        Err(AppError::Unauthorized(reason.to_string()))
    }
}
