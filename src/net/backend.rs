//! Auth endpoints of the trip backend.
//!
//! The session store talks to the backend only through [`AuthBackend`], so
//! tests can script token validity without a network. [`HttpAuthBackend`] is
//! the real implementation over [`ApiClient`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::AuthError;
use crate::net::api::{ApiClient, RequestOptions};
use crate::session::{RefreshedTokens, TokenPair, UserProfile};

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

pub const LOGIN_ENDPOINT: &str = "/api/auth/login/";
pub const REGISTER_ENDPOINT: &str = "/api/auth/register/";
pub const REFRESH_ENDPOINT: &str = "/api/auth/refresh/";
pub const ME_ENDPOINT: &str = "/api/auth/me/";

const MISSING_LOGIN_TOKENS: &str = "Login response did not contain expected tokens.";
const MISSING_REFRESH_TOKEN: &str = "Refresh response did not contain an access token.";
const PROFILE_NOT_OBJECT: &str = "Profile response was not a JSON object.";

// =============================================================================
// INPUTS
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("username", &self.username).finish_non_exhaustive()
    }
}

/// New-account form. Checked locally before anything is sent.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Registration {
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for blank required fields or a
    /// password confirmation that does not match.
    pub fn validate(&self) -> Result<(), AuthError> {
        for (field, value) in [("name", &self.name), ("username", &self.username), ("password", &self.password)] {
            if value.trim().is_empty() {
                return Err(AuthError::Validation(format!("{field} is required")));
            }
        }
        if self.password != self.confirm_password {
            return Err(AuthError::Validation("Passwords do not match".to_owned()));
        }
        Ok(())
    }

    /// Wire body. Email is sent only when filled in.
    fn payload(&self) -> Value {
        let mut body = json!({
            "name": self.name,
            "username": self.username,
            "password": self.password,
            "confirm_password": self.confirm_password,
        });
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            body["email"] = Value::String(email.to_owned());
        }
        body
    }
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for an access/refresh pair.
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, AuthError>;

    /// Create an account. Returns the backend payload unchanged.
    async fn register(&self, registration: &Registration) -> Result<Value, AuthError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, AuthError>;

    /// Fetch the profile of the account owning `access_token`.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AuthError>;
}

// =============================================================================
// HTTP
// =============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

fn non_empty(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

#[derive(Clone)]
pub struct HttpAuthBackend {
    api: ApiClient,
}

impl HttpAuthBackend {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, AuthError> {
        let body = json!({ "username": credentials.username, "password": credentials.password });
        let response: TokenResponse = self.api.fetch_api(LOGIN_ENDPOINT, RequestOptions::post(body)).await?.json()?;
        match (non_empty(response.access), non_empty(response.refresh)) {
            (Some(access), Some(refresh)) => Ok(TokenPair { access, refresh }),
            _ => Err(AuthError::MalformedResponse(MISSING_LOGIN_TOKENS.to_owned())),
        }
    }

    async fn register(&self, registration: &Registration) -> Result<Value, AuthError> {
        registration.validate()?;
        let response = self
            .api
            .fetch_api(REGISTER_ENDPOINT, RequestOptions::post(registration.payload()))
            .await?;
        Ok(response.into_value())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, AuthError> {
        let body = json!({ "refresh": refresh_token });
        let response: TokenResponse = self.api.fetch_api(REFRESH_ENDPOINT, RequestOptions::post(body)).await?.json()?;
        let access = non_empty(response.access)
            .ok_or_else(|| AuthError::MalformedResponse(MISSING_REFRESH_TOKEN.to_owned()))?;
        Ok(RefreshedTokens { access, refresh: non_empty(response.refresh) })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let response = self
            .api
            .fetch_with_token(ME_ENDPOINT, access_token, RequestOptions::get())
            .await?;
        UserProfile::from_value(response.into_value())
            .ok_or_else(|| AuthError::MalformedResponse(PROFILE_NOT_OBJECT.to_owned()))
    }
}
