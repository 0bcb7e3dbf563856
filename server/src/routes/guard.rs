//! Route guard middleware for page requests.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use triptrack::guard::{RouteDecision, decide};
use triptrack::session::cookie::AUTH_COOKIE_NAME;

/// Redirect based on `authToken` presence before the page is served.
pub async fn route_guard(jar: CookieJar, request: Request, next: Next) -> Response {
    let token = jar.get(AUTH_COOKIE_NAME).map(Cookie::value);
    match decide(request.uri().path(), token) {
        RouteDecision::Pass => next.run(request).await,
        RouteDecision::Redirect(to) => {
            tracing::debug!(path = %request.uri().path(), %to, "route guard redirect");
            Redirect::temporary(to).into_response()
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
