// ============================
// idgate-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the `idgate` login gateway.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod idp;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod session;
pub mod templates;

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use tracing::warn;

use crate::auth::AuthService;
use crate::config::Settings;
use crate::error::AppError;
use crate::idp::{FreeIpa, FreeIpaDirectory};
use crate::session::CookieOptions;
use crate::templates::Templates;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<AuthService>,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
    /// Compiled page templates
    pub templates: Arc<Templates>,
    /// Key encrypting the session cookie
    cookie_key: Key,
}

impl AppState {
    /// Create a new application state around an existing auth service
    pub fn new(auth: AuthService, settings: Settings) -> Result<Self, AppError> {
        let cookie_key = match settings.cookie_key()? {
            Some(key) => key,
            None => {
                warn!("session.key is not set, using a random key; sessions end on restart");
                Key::generate()
            },
        };

        Ok(Self {
            auth: Arc::new(auth),
            settings: Arc::new(settings),
            templates: Arc::new(Templates::new()?),
            cookie_key,
        })
    }

    /// Create the application state talking to the configured FreeIPA server
    pub fn from_settings(settings: Settings) -> Result<Self, AppError> {
        settings.validate()?;

        let mut auth = AuthService::new(Arc::new(FreeIpa::new(&settings.idp)))
            .with_precheck(settings.auth.precheck_user);
        if let Some(directory) = FreeIpaDirectory::from_settings(&settings) {
            auth = auth.with_directory(Arc::new(directory));
        }

        Self::new(auth, settings)
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for CookieOptions {
    fn from_ref(state: &AppState) -> Self {
        CookieOptions::from(&state.settings.session)
    }
}
