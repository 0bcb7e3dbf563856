//! Auth routes: proxy login/register/profile to the backend and manage the
//! `authToken` cookie.
//!
//! ERROR HANDLING
//! ==============
//! Backend rejections keep their status and surface the backend `detail` as
//! `{ "error": ... }`. An unreachable or misbehaving backend is a 500.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::json;
use triptrack::AuthError;
use triptrack::net::backend::{Credentials, Registration};
use triptrack::session::cookie::{AUTH_COOKIE_NAME, auth_cookie, cleared_auth_cookie};

use crate::state::AppState;

const LOGIN_FAILED: &str = "Authentication failed";
const REGISTRATION_FAILED: &str = "Registration failed";

// =============================================================================
// RESPONSES
// =============================================================================

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn internal_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn success(status: StatusCode) -> Response {
    (status, Json(json!({ "success": true }))).into_response()
}

/// The backend's `detail`, or `fallback` when the rejection carried none.
pub(crate) fn detail_or<'a>(status: u16, message: &'a str, fallback: &'a str) -> &'a str {
    let generic = message.trim().is_empty()
        || message == format!("Request failed with status {status}")
        || message == format!("HTTP error! status: {status}");
    if generic { fallback } else { message }
}

fn auth_failure(err: &AuthError, fallback: &str) -> Response {
    match err {
        AuthError::Rejected { status, message } => {
            let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            error_response(code, detail_or(*status, message, fallback))
        }
        AuthError::Validation(message) => error_response(StatusCode::BAD_REQUEST, message),
        AuthError::Network(_) | AuthError::MalformedResponse(_) => internal_error(),
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/auth/login`: exchange credentials, set the `authToken` cookie.
pub async fn login(State(state): State<AppState>, body: Result<Json<Credentials>, JsonRejection>) -> Response {
    let Ok(Json(credentials)) = body else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
    };

    match state.auth.login(&credentials).await {
        Ok(pair) => {
            tracing::info!(username = %credentials.username, "login proxied");
            let jar = CookieJar::new().add(auth_cookie(pair.access, &state.cookie_policy));
            (jar, success(StatusCode::OK)).into_response()
        }
        Err(e) => {
            tracing::warn!(username = %credentials.username, error = %e, "login rejected");
            auth_failure(&e, LOGIN_FAILED)
        }
    }
}

/// `POST /api/auth/logout`: expire the cookie.
pub async fn logout(State(state): State<AppState>) -> Response {
    let jar = CookieJar::new().add(cleared_auth_cookie(&state.cookie_policy));
    (jar, success(StatusCode::OK)).into_response()
}

/// `GET /api/auth/me`: profile for the cookie's token.
pub async fn me(State(state): State<AppState>, jar: CookieJar) -> Response {
    let token = jar.get(AUTH_COOKIE_NAME).map(Cookie::value).unwrap_or_default();
    if token.is_empty() {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    match state.auth.fetch_profile(token).await {
        Ok(profile) => Json(profile).into_response(),
        Err(AuthError::Network(e)) => {
            tracing::error!(error = %e, "profile lookup failed");
            internal_error()
        }
        Err(e) => {
            tracing::debug!(error = %e, "profile lookup rejected");
            error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    name: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    password: String,
    #[serde(default)]
    confirm_password: Option<String>,
}

impl RegisterRequest {
    /// Username defaults to the email; a missing confirmation echoes the password.
    fn into_registration(self) -> Registration {
        let username = self.username.filter(|u| !u.trim().is_empty()).or_else(|| self.email.clone());
        Registration {
            name: self.name,
            username: username.unwrap_or_default(),
            email: self.email,
            confirm_password: self.confirm_password.unwrap_or_else(|| self.password.clone()),
            password: self.password,
        }
    }
}

/// `POST /api/auth/register`: create the account. Does not log in.
pub async fn register(State(state): State<AppState>, body: Result<Json<RegisterRequest>, JsonRejection>) -> Response {
    let Ok(Json(request)) = body else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
    };
    let registration = request.into_registration();
    if let Err(e) = registration.validate() {
        return auth_failure(&e, REGISTRATION_FAILED);
    }

    match state.auth.register(&registration).await {
        Ok(_) => {
            tracing::info!(username = %registration.username, "registration proxied");
            success(StatusCode::CREATED)
        }
        Err(e) => {
            tracing::warn!(username = %registration.username, error = %e, "registration rejected");
            auth_failure(&e, REGISTRATION_FAILED)
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
