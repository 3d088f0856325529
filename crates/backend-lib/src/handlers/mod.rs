// ============================
// idgate-backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod auth;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

pub use auth::{healthz, index, login_page, login_submit, logout, LoginForm};

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// `302 Found` to `location`
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
