//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! `/api/auth/*` proxies the backend's auth endpoints and manages the
//! `authToken` cookie. Everything else is the page tree, served from a
//! static directory behind the route guard.

pub mod auth;
pub mod guard;

#[cfg(test)]
pub(crate) mod testing;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let pages = ServeDir::new(&state.pages_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/me", get(auth::me))
        .route("/healthz", get(healthz))
        .fallback_service(pages)
        .layer(middleware::from_fn(guard::route_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
