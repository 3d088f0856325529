// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Login, logout and landing page handlers.
use std::fmt;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use metrics::counter;
use serde::Deserialize;
use tracing::info;
use zeroize::Zeroize;

use super::{found, LOGIN_PATH};
use crate::auth::csrf;
use crate::error::AppError;
use crate::metrics::LOGOUT;
use crate::session::{lifecycle, CookieSession, SessionStore};
use crate::AppState;

/// Fields posted by the login form
#[derive(Deserialize, Default)]
pub struct LoginForm {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub csrf: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("uid", &self.uid)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Drop for LoginForm {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// `GET /auth/login`
pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let (jar, token) = csrf::ensure_token(jar);
    let html = state.templates.login(&token, "", None)?;
    Ok((jar, Html(html)))
}

/// `POST /auth/login`
///
/// Redirects on success; any authentication failure re-renders the form
/// with the classified message and a `200`.
pub async fn login_submit(
    State(state): State<AppState>,
    mut session: CookieSession,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    csrf::verify(&jar, &form.csrf)?;

    match state.auth.login(&form.uid, &form.password).await {
        Ok(token) => {
            let location = lifecycle::commit(&mut session, &form.uid, &token)?;
            Ok((session, found(&location)).into_response())
        },
        Err(err) => {
            let message = err.to_string();
            let html = state
                .templates
                .login(&form.csrf, &form.uid, Some(&message))?;
            Ok(Html(html).into_response())
        },
    }
}

/// `GET|POST /auth/logout`, always succeeds
pub async fn logout(mut session: CookieSession) -> Response {
    let uid = session.record().user_id().map(str::to_string);
    lifecycle::clear(&mut session);
    counter!(LOGOUT).increment(1);
    info!(uid = ?uid, "session cleared");
    (session, found(LOGIN_PATH)).into_response()
}

/// `GET /`, behind `require_login`
pub async fn index(
    State(state): State<AppState>,
    session: CookieSession,
) -> Result<Html<String>, AppError> {
    let user = session.record().user_id().unwrap_or_default();
    Ok(Html(state.templates.index(user)?))
}

pub async fn healthz() -> &'static str {
    "ok"
}
