use super::*;

#[test]
fn protected_without_cookie_redirects_to_login() {
    assert_eq!(decide("/dashboard", None), RouteDecision::Redirect("/login"));
    assert_eq!(decide("/dashboard/trips", None), RouteDecision::Redirect("/login"));
    assert_eq!(decide("/profile", None), RouteDecision::Redirect("/login"));
    assert_eq!(decide("/profile/settings", Some("")), RouteDecision::Redirect("/login"));
}

#[test]
fn protected_with_cookie_passes_even_if_stale() {
    assert_eq!(decide("/dashboard", Some("expired.jwt.value")), RouteDecision::Pass);
    assert_eq!(decide("/dashboard/map/7", Some("t")), RouteDecision::Pass);
}

#[test]
fn auth_routes_with_cookie_redirect_to_dashboard() {
    assert_eq!(decide("/login", Some("t")), RouteDecision::Redirect("/dashboard"));
    assert_eq!(decide("/register", Some("t")), RouteDecision::Redirect("/dashboard"));
}

#[test]
fn auth_routes_without_cookie_pass() {
    assert_eq!(decide("/login", None), RouteDecision::Pass);
    assert_eq!(decide("/register", Some("")), RouteDecision::Pass);
}

#[test]
fn auth_route_match_is_exact() {
    assert_eq!(decide("/login/help", Some("t")), RouteDecision::Pass);
    assert_eq!(decide("/registered", Some("t")), RouteDecision::Pass);
}

#[test]
fn sibling_names_are_not_protected() {
    assert!(!is_protected("/dashboards"));
    assert!(!is_protected("/profiles/x"));
    assert_eq!(decide("/dashboards", None), RouteDecision::Pass);
}

#[test]
fn other_paths_pass() {
    assert_eq!(decide("/", None), RouteDecision::Pass);
    assert_eq!(decide("/about", Some("t")), RouteDecision::Pass);
}

#[test]
fn api_and_static_paths_are_never_guarded() {
    assert_eq!(decide("/api/auth/me", None), RouteDecision::Pass);
    assert_eq!(decide("/static/app.css", None), RouteDecision::Pass);
    assert_eq!(decide("/favicon.ico", None), RouteDecision::Pass);
}
