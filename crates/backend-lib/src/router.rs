// ============================
// idgate-backend-lib/src/router.rs
// ============================
//! HTTP router.
use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, LOGIN_PATH, LOGOUT_PATH};
use crate::middleware::require_login;
use crate::AppState;

/// Create the router
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(handlers::index))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    Router::new()
        .route(
            LOGIN_PATH,
            get(handlers::login_page).post(handlers::login_submit),
        )
        .route(LOGOUT_PATH, get(handlers::logout).post(handlers::logout))
        .route("/healthz", get(handlers::healthz))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
