//! Test utilities for the idgate integration tests
//!
//! Provides a scripted identity provider and a tiny cookie-keeping client
//! that drives the router the way a browser would.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use idgate_backend_lib::{
    auth::AuthService,
    config::Settings,
    error::IdpError,
    idp::{IdentityProvider, IdpConnection, SessionToken},
    router::create_router,
    AppState,
};
use idgate_common::SessionRecord;
use tower::ServiceExt;

pub const COOKIE_NAME: &str = "test-sess";
const KEY_BYTES: [u8; 64] = [42; 64];

/// Identity provider that knows exactly one account
pub struct StubIdp {
    uid: &'static str,
    password: &'static str,
    probe_ok: bool,
    connects: AtomicUsize,
}

impl StubIdp {
    pub fn new(uid: &'static str, password: &'static str) -> Arc<Self> {
        Arc::new(Self {
            uid,
            password,
            probe_ok: true,
            connects: AtomicUsize::new(0),
        })
    }

    /// Accepts the credentials but fails the liveness probe
    pub fn unreachable_after_login(uid: &'static str, password: &'static str) -> Arc<Self> {
        Arc::new(Self {
            uid,
            password,
            probe_ok: false,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

struct StubConnection {
    uid: &'static str,
    password: &'static str,
    probe_ok: bool,
    attempt: usize,
    logged_in: bool,
}

#[async_trait]
impl IdentityProvider for StubIdp {
    async fn connect(&self) -> Result<Box<dyn IdpConnection>, IdpError> {
        let attempt = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(StubConnection {
            uid: self.uid,
            password: self.password,
            probe_ok: self.probe_ok,
            attempt,
            logged_in: false,
        }))
    }
}

#[async_trait]
impl IdpConnection for StubConnection {
    async fn login(&mut self, uid: &str, password: &str) -> Result<(), IdpError> {
        if uid == self.uid && password == self.password {
            self.logged_in = true;
            Ok(())
        } else {
            Err(IdpError::Rejected {
                reason: "password-expired".to_string(),
            })
        }
    }

    async fn probe(&mut self) -> Result<SessionToken, IdpError> {
        if self.logged_in && self.probe_ok {
            Ok(SessionToken::new(format!("stub-session-{}", self.attempt)))
        } else {
            Err(IdpError::Protocol("ping timed out".to_string()))
        }
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.session.cookie_name = COOKIE_NAME.to_string();
    settings.session.secure = false;
    settings.session.key = Some(STANDARD.encode(KEY_BYTES));
    settings
}

pub fn test_key() -> Key {
    Key::from(&KEY_BYTES)
}

/// Router wired to `idp`
pub fn test_app(idp: Arc<StubIdp>) -> Router {
    let state = AppState::new(AuthService::new(idp), test_settings())
        .expect("Failed to create AppState for test");
    create_router(state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }
}

/// Keeps cookies between requests like a browser
pub struct Browser {
    app: Router,
    cookies: BTreeMap<String, String>,
}

impl Browser {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookies: BTreeMap::new(),
        }
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    /// Store an encrypted session cookie as if an earlier response had set it
    pub fn seed_session(&mut self, record: &SessionRecord) {
        let value = serde_json::to_string(record).unwrap();
        let jar = PrivateCookieJar::new(test_key()).add(Cookie::new(COOKIE_NAME, value));
        let response = (jar, ()).into_response();
        for value in response.headers().get_all(header::SET_COOKIE) {
            self.store_cookie(value.to_str().unwrap());
        }
    }

    /// Decrypt the current session cookie
    pub fn session(&self) -> Option<SessionRecord> {
        let value = self.cookies.get(COOKIE_NAME)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("{COOKIE_NAME}={value}").parse().unwrap(),
        );
        let jar = PrivateCookieJar::from_headers(&headers, test_key());
        let cookie = jar.get(COOKIE_NAME)?;
        serde_json::from_str(cookie.value()).ok()
    }

    fn store_cookie(&mut self, set_cookie: &str) {
        let pair = set_cookie.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            return;
        };
        if value.is_empty() || set_cookie.contains("Max-Age=0") {
            self.cookies.remove(name.trim());
        } else {
            self.cookies
                .insert(name.trim().to_string(), value.to_string());
        }
    }

    pub async fn send(&mut self, method: Method, path: &str, form: Option<String>) -> TestResponse {
        let mut request = Request::builder().method(method).uri(path);
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(header::COOKIE, cookie_header);
        }
        let body = match form {
            Some(form) => {
                request = request.header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                );
                Body::from(form)
            },
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let response = TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        };
        for set_cookie in response.set_cookies() {
            self.store_cookie(&set_cookie);
        }
        response
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let form = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(Method::POST, path, Some(form)).await
    }

    /// Load the login page and return the embedded anti-forgery token
    pub async fn csrf_token(&mut self) -> String {
        let page = self.get("/auth/login").await;
        assert_eq!(page.status, StatusCode::OK);
        extract_csrf(&page.body).expect("login page without csrf token")
    }

    /// Submit the login form with a valid anti-forgery token
    pub async fn login(&mut self, uid: &str, password: &str) -> TestResponse {
        let csrf = self.csrf_token().await;
        self.post_form(
            "/auth/login",
            &[("uid", uid), ("password", password), ("csrf", &csrf)],
        )
        .await
    }
}

pub fn extract_csrf(body: &str) -> Option<String> {
    let marker = r#"name="csrf" value=""#;
    let start = body.find(marker)? + marker.len();
    let end = body[start..].find('"')?;
    Some(body[start..start + end].to_string())
}

fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            },
            _ => format!("%{b:02X}"),
        })
        .collect()
}
