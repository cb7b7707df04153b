//! Token validation endpoint

use crate::middleware::AuthUser;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TokenValidation {
    pub valid: bool,
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

/// Echo the caller's identity; the extractor has already rejected bad tokens
pub async fn validate_token(user: AuthUser) -> Json<TokenValidation> {
    Json(TokenValidation {
        valid: true,
        user_id: user.id,
        username: user.username,
        email: user.email,
    })
}
