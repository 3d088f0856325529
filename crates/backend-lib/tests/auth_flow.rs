//! End-to-end login and logout flows through the router
mod test_utils;

use axum::http::StatusCode;
use idgate_common::{SessionRecord, SessionState};
use test_utils::{extract_csrf, test_app, Browser, StubIdp};

#[tokio::test]
async fn test_login_page_renders_form_with_token() {
    let mut browser = Browser::new(test_app(StubIdp::new("alice", "secret")));

    let page = browser.get("/auth/login").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains(r#"action="/auth/login""#));
    assert!(extract_csrf(&page.body).is_some());
    assert!(browser.has_cookie("_csrf"));
}

#[tokio::test]
async fn test_empty_username_rerenders_form() {
    let idp = StubIdp::new("alice", "secret");
    let mut browser = Browser::new(test_app(idp.clone()));

    let response = browser.login("", "x").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Please provide a username"));
    assert_eq!(idp.connects(), 0);
}

#[tokio::test]
async fn test_empty_password_rerenders_form() {
    let idp = StubIdp::new("alice", "secret");
    let mut browser = Browser::new(test_app(idp.clone()));

    let response = browser.login("alice", "").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Please provide a password"));
    assert_eq!(idp.connects(), 0);
}

#[tokio::test]
async fn test_rejected_credentials_show_invalid_login() {
    let mut browser = Browser::new(test_app(StubIdp::new("alice", "secret")));

    let response = browser.login("alice", "wrong").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Invalid login"));
    // The provider's reason stays in the logs
    assert!(!response.body.contains("password-expired"));
    assert!(browser.session().is_none());
}

#[tokio::test]
async fn test_unknown_user_looks_like_bad_password() {
    let mut browser = Browser::new(test_app(StubIdp::new("alice", "secret")));

    let wrong_password = browser.login("alice", "wrong").await;
    let unknown_user = browser.login("mallory", "wrong").await;
    assert_eq!(wrong_password.status, unknown_user.status);
    assert!(unknown_user.body.contains("Invalid login"));
}

#[tokio::test]
async fn test_probe_failure_shows_provider_error() {
    let mut browser = Browser::new(test_app(StubIdp::unreachable_after_login(
        "alice", "secret",
    )));

    let response = browser.login("alice", "secret").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Error contacting identity provider"));
    assert!(!response.body.contains("ping timed out"));
}

#[tokio::test]
async fn test_login_returns_to_stored_target() {
    let mut browser = Browser::new(test_app(StubIdp::new("alice", "secret")));
    browser.seed_session(&SessionRecord {
        wyaf: Some("/dashboard".to_string()),
        ..Default::default()
    });

    let response = browser.login("alice", "secret").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/dashboard"));

    let session = browser.session().expect("session cookie after login");
    assert!(session.authenticated);
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.user.as_deref(), Some("alice"));
    assert_eq!(session.sid.as_deref(), Some("stub-session-1"));
    assert_eq!(session.wyaf, None);

    let home = browser.get("/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.body.contains("Signed in as alice"));
}

#[tokio::test]
async fn test_login_without_target_goes_to_root() {
    let mut browser = Browser::new(test_app(StubIdp::new("alice", "secret")));

    let response = browser.login("alice", "secret").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn test_protected_page_round_trip() {
    let mut browser = Browser::new(test_app(StubIdp::new("alice", "secret")));

    let response = browser.get("/?tab=keys").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/auth/login"));
    assert_eq!(
        browser.session().and_then(|s| s.wyaf).as_deref(),
        Some("/?tab=keys")
    );

    let response = browser.login("alice", "secret").await;
    assert_eq!(response.location(), Some("/?tab=keys"));

    // Target was single-use
    browser.get("/auth/logout").await;
    let response = browser.login("alice", "secret").await;
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn test_half_committed_session_is_anonymous() {
    let mut browser = Browser::new(test_app(StubIdp::new("alice", "secret")));
    browser.seed_session(&SessionRecord {
        user: Some("alice".to_string()),
        sid: None,
        authenticated: true,
        wyaf: None,
    });
    assert_eq!(
        browser.session().map(|s| s.state()),
        Some(SessionState::Anonymous)
    );

    let response = browser.get("/").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/auth/login"));
}

#[tokio::test]
async fn test_logout_without_session() {
    let mut browser = Browser::new(test_app(StubIdp::new("alice", "secret")));

    let response = browser.get("/auth/logout").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/auth/login"));

    // Second logout behaves the same
    let response = browser.get("/auth/logout").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/auth/login"));
}

#[tokio::test]
async fn test_logout_expires_session_cookie() {
    let mut browser = Browser::new(test_app(StubIdp::new("alice", "secret")));
    browser.login("alice", "secret").await;
    assert!(browser.has_cookie(test_utils::COOKIE_NAME));

    let response = browser.get("/auth/logout").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/auth/login"));
    assert!(response
        .set_cookies()
        .iter()
        .any(|c| c.starts_with("test-sess=;") && c.contains("Max-Age=0")));
    assert!(!browser.has_cookie(test_utils::COOKIE_NAME));

    let home = browser.get("/").await;
    assert_eq!(home.status, StatusCode::FOUND);
    assert_eq!(home.location(), Some("/auth/login"));
}

#[tokio::test]
async fn test_post_without_csrf_is_forbidden() {
    let idp = StubIdp::new("alice", "secret");
    let mut browser = Browser::new(test_app(idp.clone()));

    let response = browser
        .post_form("/auth/login", &[("uid", "alice"), ("password", "secret")])
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(idp.connects(), 0);

    browser.csrf_token().await;
    let response = browser
        .post_form(
            "/auth/login",
            &[("uid", "alice"), ("password", "secret"), ("csrf", "forged")],
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(idp.connects(), 0);
}

#[tokio::test]
async fn test_healthz() {
    let mut browser = Browser::new(test_app(StubIdp::new("alice", "secret")));
    let response = browser.get("/healthz").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
}
