//! Client session: tokens, user profile, and lifecycle status.
//!
//! ARCHITECTURE
//! ============
//! [`store::SessionStore`] is the single authority for authentication state.
//! Durable storage ([`storage`]) and the `authToken` cookie ([`cookie`]) are
//! derived mirrors rewritten on every mutation; neither is read back for
//! correctness once the store has initialized. [`refresh::TokenRefresher`]
//! performs the refresh-token exchange on the store's behalf.

pub mod cookie;
pub mod refresh;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Durable storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Durable storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

// =============================================================================
// STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

impl SessionStatus {
    /// `true` once startup hydration has finished either way.
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Authenticated | Self::Anonymous)
    }
}

// =============================================================================
// PROFILE / TOKENS
// =============================================================================

/// Backend-provided user record. Only "is a JSON object" is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value; `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    /// First non-empty of name, username, email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        ["name", "username", "email"]
            .iter()
            .filter_map(|key| self.0.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or("unknown user")
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Access/refresh pair issued by login. Both halves are always present.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair").field("access", &"<redacted>").field("refresh", &"<redacted>").finish()
    }
}

/// Result of a refresh exchange. `refresh` is set when the backend rotates it.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access: String,
    pub refresh: Option<String>,
}

impl std::fmt::Debug for RefreshedTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshedTokens")
            .field("access", &"<redacted>")
            .field("rotated", &self.refresh.is_some())
            .finish()
    }
}

// =============================================================================
// SESSION SNAPSHOT
// =============================================================================

/// Point-in-time copy of the store's state, handed to readers.
#[derive(Clone, PartialEq, Default)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    pub status: SessionStatus,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("status", &self.status)
            .finish()
    }
}
