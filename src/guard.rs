//! Page-request route guard.
//!
//! A presence-only check of the `authToken` cookie. It never validates the
//! token and never calls the backend: a stale cookie lets the user through
//! and the page's own data calls fail instead. Not a security boundary.

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

pub const LOGIN_ROUTE: &str = "/login";
pub const REGISTER_ROUTE: &str = "/register";
pub const DASHBOARD_ROUTE: &str = "/dashboard";
pub const PROFILE_ROUTE: &str = "/profile";

const PROTECTED_PREFIXES: [&str; 2] = [DASHBOARD_ROUTE, PROFILE_ROUTE];
const AUTH_ROUTES: [&str; 2] = [LOGIN_ROUTE, REGISTER_ROUTE];
const UNGUARDED_PREFIXES: [&str; 2] = ["/api/", "/static/"];
const UNGUARDED_PATHS: [&str; 1] = ["/favicon.ico"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Pass,
    Redirect(&'static str),
}

/// Decide what to do with a page request.
///
/// `auth_cookie` is the raw cookie value; an empty value counts as absent.
#[must_use]
pub fn decide(path: &str, auth_cookie: Option<&str>) -> RouteDecision {
    if is_unguarded(path) {
        return RouteDecision::Pass;
    }
    let has_cookie = auth_cookie.is_some_and(|v| !v.is_empty());

    if is_auth_route(path) && has_cookie {
        return RouteDecision::Redirect(DASHBOARD_ROUTE);
    }
    if is_protected(path) && !has_cookie {
        return RouteDecision::Redirect(LOGIN_ROUTE);
    }
    RouteDecision::Pass
}

/// `/dashboard`, `/profile`, and anything below them.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

#[must_use]
pub fn is_auth_route(path: &str) -> bool {
    AUTH_ROUTES.contains(&path)
}

fn is_unguarded(path: &str) -> bool {
    UNGUARDED_PATHS.contains(&path) || UNGUARDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}
