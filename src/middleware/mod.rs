//! Request middleware: request ids, token authentication and AI rate limiting

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AuthUser, auth_middleware};
pub use rate_limit::rate_limit_middleware;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
