// ============================
// crates/backend-lib/src/auth/csrf.rs
// ============================
//! Double-submit anti-forgery token for the login form.
//!
//! The token lives in a plain cookie and is echoed back as the `csrf`
//! form field; a POST is accepted only when both match.
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::token_generator::generate_secure_token;
use crate::error::AppError;

pub const CSRF_COOKIE: &str = "_csrf";

/// Return the request's token, minting one (and its cookie) if there is none.
pub fn ensure_token(jar: CookieJar) -> (CookieJar, String) {
    if let Some(token) = current_token(&jar) {
        return (jar, token);
    }

    let token = generate_secure_token();
    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();
    (jar.add(cookie), token)
}

pub fn current_token(jar: &CookieJar) -> Option<String> {
    jar.get(CSRF_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Check a submitted form token against the cookie
pub fn verify(jar: &CookieJar, submitted: &str) -> Result<(), AppError> {
    match current_token(jar) {
        Some(expected) if constant_time_eq(expected.as_bytes(), submitted.as_bytes()) => Ok(()),
        _ => Err(AppError::Csrf),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
