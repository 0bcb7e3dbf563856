//! Refresh-token exchange.
//!
//! The refresher only performs the exchange and reports the outcome. The
//! session store decides what happens to state: commit on success, full
//! logout on failure.

use std::sync::Arc;

use crate::error::AuthError;
use crate::net::backend::AuthBackend;
use crate::session::RefreshedTokens;

pub struct TokenRefresher {
    backend: Arc<dyn AuthBackend>,
}

impl TokenRefresher {
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self { backend }
    }

    /// Exchange `refresh_token` for a new access token.
    ///
    /// # Errors
    ///
    /// Returns the backend failure unchanged; every failure (rejection,
    /// network, malformed body) is treated the same by the caller.
    pub async fn exchange(&self, refresh_token: &str) -> Result<RefreshedTokens, AuthError> {
        match self.backend.refresh(refresh_token).await {
            Ok(tokens) => {
                tracing::info!(rotated = tokens.refresh.is_some(), "access token refreshed");
                Ok(tokens)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed");
                Err(e)
            }
        }
    }
}
