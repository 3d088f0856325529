use axum::{
    extract::Request,
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use idgate_common::SessionState;
use tracing::{debug, warn};

use crate::handlers::{found, LOGIN_PATH};
use crate::session::{lifecycle, CookieSession, SessionStore};

/// Send anonymous requests to the login page, remembering where they were headed
pub async fn require_login(mut session: CookieSession, request: Request, next: Next) -> Response {
    if session.record().state() == SessionState::Authenticated {
        return next.run(request).await;
    }

    if request.method() == Method::GET {
        let target = request
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        if let Err(err) = lifecycle::remember_target(&mut session, target) {
            warn!(error = %err, "failed to remember redirect target");
        }
    }

    debug!(path = %request.uri().path(), "anonymous request redirected to login");
    (session, found(LOGIN_PATH)).into_response()
}
