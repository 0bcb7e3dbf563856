//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! server keeps no per-user session: the only credential it sees is the
//! `authToken` cookie, which it forwards to the backend on each request.

use std::path::PathBuf;
use std::sync::Arc;

use triptrack::ApiClient;
use triptrack::ConfigError;
use triptrack::net::backend::{AuthBackend, HttpAuthBackend};
use triptrack::session::cookie::CookiePolicy;

use crate::config::ServerConfig;

/// Clone is required by Axum; the backend handle is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthBackend>,
    pub cookie_policy: CookiePolicy,
    pub pages_dir: PathBuf,
}

impl AppState {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthBackend>, cookie_policy: CookiePolicy, pages_dir: PathBuf) -> Self {
        Self { auth, cookie_policy, pages_dir }
    }

    /// State wired to the real backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let auth = Arc::new(HttpAuthBackend::new(ApiClient::new(&config.client)?));
        let policy = CookiePolicy::server(config.client.cookie_max_age(), config.cookie_secure);
        Ok(Self::new(auth, policy, config.pages_dir.clone()))
    }
}
