// ============================
// idgate-backend-lib/src/session/mod.rs
// ============================
//! Cookie-backed session store.
//!
//! The whole [`SessionRecord`] lives in one encrypted cookie. A
//! [`CookieSession`] is extracted per request, mutated by the
//! [`lifecycle`] functions and handed back to axum as a response part.

pub mod lifecycle;

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponseParts, ResponseParts};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use idgate_common::SessionRecord;
use time::Duration;
use tracing::debug;

use crate::config::SessionSettings;
use crate::error::SessionError;

/// Narrow contract the session lifecycle needs from a store
pub trait SessionStore {
    fn record(&self) -> &SessionRecord;

    fn record_mut(&mut self) -> &mut SessionRecord;

    /// Make the next `save` tell the client to discard the session
    fn expire(&mut self);

    /// Persist the record
    fn save(&mut self) -> Result<(), SessionError>;
}

/// Cookie attributes for the session cookie
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub name: String,
    pub max_age_secs: i64,
    pub secure: bool,
}

impl From<&SessionSettings> for CookieOptions {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            name: settings.cookie_name.clone(),
            max_age_secs: settings.max_age_secs,
            secure: settings.secure,
        }
    }
}

/// Request-scoped handle on the session cookie
pub struct CookieSession {
    jar: PrivateCookieJar,
    record: SessionRecord,
    options: CookieOptions,
    expired: bool,
}

impl CookieSession {
    /// Read the record from `jar`; a missing or unreadable cookie yields an anonymous record.
    pub fn load(jar: PrivateCookieJar, options: CookieOptions) -> Self {
        let record = jar
            .get(&options.name)
            .and_then(|cookie| match serde_json::from_str(cookie.value()) {
                Ok(record) => Some(record),
                Err(err) => {
                    debug!(error = %err, "discarding undecodable session cookie");
                    None
                },
            })
            .unwrap_or_default();

        Self {
            jar,
            record,
            options,
            expired: false,
        }
    }

    /// Jar holding the pending cookie changes
    pub fn into_jar(self) -> PrivateCookieJar {
        self.jar
    }

    fn base_cookie(&self) -> Cookie<'static> {
        Cookie::build(self.options.name.clone()).path("/").build()
    }
}

impl SessionStore for CookieSession {
    fn record(&self) -> &SessionRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut SessionRecord {
        &mut self.record
    }

    fn expire(&mut self) {
        self.expired = true;
    }

    fn save(&mut self) -> Result<(), SessionError> {
        let jar = self.jar.clone();
        self.jar = if self.expired {
            // Removal cookie: empty value, zero max-age, expiry in the past
            jar.remove(self.base_cookie())
        } else {
            let value = serde_json::to_string(&self.record)?;
            let mut cookie = self.base_cookie();
            cookie.set_value(value);
            cookie.set_http_only(true);
            cookie.set_secure(self.options.secure);
            cookie.set_same_site(SameSite::Lax);
            cookie.set_max_age(Duration::seconds(self.options.max_age_secs));
            jar.add(cookie)
        };
        Ok(())
    }
}

impl<S> FromRequestParts<S> for CookieSession
where
    S: Send + Sync,
    Key: FromRef<S>,
    CookieOptions: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state).await?;
        Ok(Self::load(jar, CookieOptions::from_ref(state)))
    }
}

impl IntoResponseParts for CookieSession {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.jar.into_response_parts(res)
    }
}
