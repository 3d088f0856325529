// ============================
// idgate-backend-lib/src/idp/freeipa.rs
// ============================
//! FreeIPA JSON-RPC client.
//!
//! Login goes through the password endpoint, which answers with an
//! `ipa_session` cookie. The `ping` RPC doubles as the liveness probe and
//! `user_show` serves directory lookups.
use async_trait::async_trait;
use idgate_common::UserRecord;
use reqwest::header::{HeaderMap, ACCEPT, COOKIE, REFERER, SET_COOKIE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{IdentityProvider, IdpConnection, SessionToken, UserDirectory};
use crate::config::{IdpSettings, Settings};
use crate::error::{DirectoryError, IdpError};

const SESSION_COOKIE: &str = "ipa_session";
const LOGIN_PATH: &str = "/ipa/session/login_password";
const RPC_PATH: &str = "/ipa/session/json";
const REJECTION_HEADER: &str = "X-IPA-Rejection-Reason";
/// FreeIPA error code for a missing entry
const NOT_FOUND_CODE: i64 = 4001;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    name: Option<String>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({}): {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Connection factory for a FreeIPA server
#[derive(Debug, Clone)]
pub struct FreeIpa {
    base_url: String,
    accept_invalid_certs: bool,
}

impl FreeIpa {
    pub fn new(settings: &IdpSettings) -> Self {
        Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            accept_invalid_certs: settings.accept_invalid_certs,
        }
    }

    /// Build a connection with its own HTTP client and no session
    pub fn open(&self) -> Result<FreeIpaConnection, IdpError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()?;
        Ok(FreeIpaConnection {
            client,
            base_url: self.base_url.clone(),
            session: None,
        })
    }
}

#[async_trait]
impl IdentityProvider for FreeIpa {
    async fn connect(&self) -> Result<Box<dyn IdpConnection>, IdpError> {
        Ok(Box::new(self.open()?))
    }
}

/// One FreeIPA session
pub struct FreeIpaConnection {
    client: reqwest::Client,
    base_url: String,
    session: Option<String>,
}

impl FreeIpaConnection {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn call(&mut self, method: &str, params: Value) -> Result<RpcResponse, IdpError> {
        let cookie = self.session.as_deref().ok_or(IdpError::NoSession)?;
        let response = self
            .client
            .post(self.url(RPC_PATH))
            .header(REFERER, self.url("/ipa"))
            .header(ACCEPT, "application/json")
            .header(COOKIE, format!("{SESSION_COOKIE}={cookie}"))
            .json(&json!({ "method": method, "params": params, "id": 0 }))
            .send()
            .await?;

        // The server may rotate the session on any call
        if let Some(session) = session_cookie(response.headers()) {
            self.session = Some(session);
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(IdpError::Rejected {
                reason: "session not accepted".to_string(),
            });
        }
        if !status.is_success() {
            return Err(IdpError::Protocol(format!(
                "{method} returned status {status}"
            )));
        }

        Ok(response.json::<RpcResponse>().await?)
    }
}

#[async_trait]
impl IdpConnection for FreeIpaConnection {
    async fn login(&mut self, uid: &str, password: &str) -> Result<(), IdpError> {
        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .header(REFERER, self.url("/ipa"))
            .header(ACCEPT, "text/plain")
            .form(&[("user", uid), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let reason = response
                .headers()
                .get(REJECTION_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("invalid-password")
                .to_string();
            return Err(IdpError::Rejected { reason });
        }
        if !status.is_success() {
            return Err(IdpError::Protocol(format!(
                "login returned status {status}"
            )));
        }

        let session = session_cookie(response.headers()).ok_or(IdpError::NoSession)?;
        self.session = Some(session);
        Ok(())
    }

    async fn probe(&mut self) -> Result<SessionToken, IdpError> {
        let response = self.call("ping", json!([[], {}])).await?;
        if let Some(err) = response.error {
            return Err(IdpError::Protocol(err.to_string()));
        }

        self.session
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(SessionToken::new)
            .ok_or(IdpError::NoSession)
    }
}

/// Directory lookups through a FreeIPA service account
#[derive(Clone)]
pub struct FreeIpaDirectory {
    provider: FreeIpa,
    bind_user: String,
    bind_password: String,
}

impl FreeIpaDirectory {
    pub fn new(provider: FreeIpa, bind_user: &str, bind_password: &str) -> Self {
        Self {
            provider,
            bind_user: bind_user.to_string(),
            bind_password: bind_password.to_string(),
        }
    }

    /// Build from settings when a service account is configured
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let (user, password) = settings.directory_credentials()?;
        Some(Self::new(FreeIpa::new(&settings.idp), user, password))
    }
}

impl std::fmt::Debug for FreeIpaDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreeIpaDirectory")
            .field("provider", &self.provider)
            .field("bind_user", &self.bind_user)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl UserDirectory for FreeIpaDirectory {
    async fn lookup(&self, uid: &str) -> Result<UserRecord, DirectoryError> {
        let mut conn = self.provider.open().map_err(DirectoryError::Bind)?;
        conn.login(&self.bind_user, &self.bind_password)
            .await
            .map_err(DirectoryError::Bind)?;

        let response = conn
            .call("user_show", json!([[uid], { "all": false }]))
            .await
            .map_err(|e| match e {
                IdpError::Transport(e) => DirectoryError::Transport(e),
                other => DirectoryError::Protocol(other.to_string()),
            })?;

        if let Some(err) = response.error {
            if err.code == NOT_FOUND_CODE {
                return Err(DirectoryError::NotFound(uid.to_string()));
            }
            return Err(DirectoryError::Protocol(err.to_string()));
        }

        response
            .result
            .as_ref()
            .and_then(|r| parse_user(&r["result"]))
            .ok_or_else(|| DirectoryError::Protocol("malformed user_show result".to_string()))
    }
}

/// Pull the `ipa_session` value out of the response cookies
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_user(entry: &Value) -> Option<UserRecord> {
    Some(UserRecord {
        uid: first_value(entry, "uid")?,
        first_name: first_value(entry, "givenname"),
        last_name: first_value(entry, "sn"),
        email: first_value(entry, "mail"),
    })
}

/// LDAP attributes come back as single-element arrays
fn first_value(entry: &Value, attr: &str) -> Option<String> {
    match entry.get(attr)? {
        Value::Array(values) => values.first()?.as_str().map(str::to_string),
        Value::String(value) => Some(value.clone()),
        _ => None,
    }
}
