//! Session store: the single owner of tokens, profile, and status.
//!
//! LIFECYCLE
//! =========
//! `Uninitialized -> Loading -> {Authenticated | Anonymous}`. Initialization
//! runs once per store; concurrent callers share the same run. After that,
//! login/logout/refresh move the status between the two settled states.
//!
//! TRADE-OFFS
//! ==========
//! In-memory state lives behind an async `RwLock` that is never held across
//! a network call, so readers always see either the old or the new state.
//! Status is published on a `watch` channel. Token readers that arrive
//! during initialization join the in-flight run and read only after it
//! settles; a wait longer than `init_wait` is logged.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::{OnceCell, RwLock, watch};

use crate::config::ClientConfig;
use crate::error::{AuthError, ConfigError};
use crate::net::api::{ApiClient, TokenSource};
use crate::net::backend::{AuthBackend, Credentials, HttpAuthBackend, Registration};
use crate::session::cookie::{CookieMirror, CookiePolicy, auth_cookie, cleared_auth_cookie};
use crate::session::refresh::TokenRefresher;
use crate::session::storage::DurableStorage;
use crate::session::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, Session, SessionStatus, UserProfile};

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

/// Where the UI lands after logout.
pub const LANDING_ROUTE: &str = "/";

#[derive(Default)]
struct SessionData {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<UserProfile>,
}

impl SessionData {
    fn derived_status(&self) -> SessionStatus {
        if self.user.is_some() && self.access_token.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }
}

pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    refresher: TokenRefresher,
    storage: Arc<dyn DurableStorage>,
    cookies: Arc<dyn CookieMirror>,
    cookie_policy: CookiePolicy,
    init_wait: Duration,
    state: RwLock<SessionData>,
    status: watch::Sender<SessionStatus>,
    init: OnceCell<SessionStatus>,
}

impl SessionStore {
    #[must_use]
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        storage: Arc<dyn DurableStorage>,
        cookies: Arc<dyn CookieMirror>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            refresher: TokenRefresher::new(backend.clone()),
            backend,
            storage,
            cookies,
            cookie_policy: CookiePolicy::client_mirror(config.cookie_max_age()),
            init_wait: config.init_wait(),
            state: RwLock::new(SessionData::default()),
            status: watch::Sender::new(SessionStatus::Uninitialized),
            init: OnceCell::new(),
        }
    }

    /// Store backed by the real HTTP auth endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_http(
        config: &ClientConfig,
        storage: Arc<dyn DurableStorage>,
        cookies: Arc<dyn CookieMirror>,
    ) -> Result<Self, ConfigError> {
        let backend = Arc::new(HttpAuthBackend::new(ApiClient::new(config)?));
        Ok(Self::new(backend, storage, cookies, config))
    }

    // =========================================================================
    // READERS
    // =========================================================================

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub async fn snapshot(&self) -> Session {
        let data = self.state.read().await;
        Session {
            access_token: data.access_token.clone(),
            refresh_token: data.refresh_token.clone(),
            user: data.user.clone(),
            status: self.status(),
        }
    }

    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Hydrate from durable storage and validate against the backend.
    ///
    /// Runs at most once; later and concurrent calls return the first
    /// run's outcome. Never fails: every failure path ends `Anonymous`.
    pub async fn initialize(&self) -> SessionStatus {
        *self.init.get_or_init(|| self.hydrate()).await
    }

    async fn hydrate(&self) -> SessionStatus {
        self.status.send_replace(SessionStatus::Loading);

        let access = self.storage.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty());
        let refresh = self.storage.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty());
        tracing::info!(access = access.is_some(), refresh = refresh.is_some(), "initializing session");

        let Some(refresh) = refresh else {
            self.clear_all().await;
            return SessionStatus::Anonymous;
        };

        {
            let mut data = self.state.write().await;
            data.access_token.clone_from(&access);
            data.refresh_token = Some(refresh);
        }

        if let Some(access) = access {
            match self.backend.fetch_profile(&access).await {
                Ok(user) => return self.settle_with_user(user).await,
                Err(e) => tracing::info!(error = %e, "stored access token rejected"),
            }
        }

        let Some(access) = self.refresh_access_token().await else {
            return SessionStatus::Anonymous;
        };
        match self.backend.fetch_profile(&access).await {
            Ok(user) => self.settle_with_user(user).await,
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed after refresh");
                self.clear_all().await;
                SessionStatus::Anonymous
            }
        }
    }

    async fn settle_with_user(&self, user: UserProfile) -> SessionStatus {
        let status = {
            let mut data = self.state.write().await;
            data.user = Some(user);
            data.derived_status()
        };
        self.status.send_replace(status);
        tracing::info!(?status, "session initialized");
        status
    }

    async fn wait_for_init(&self) {
        let started = Instant::now();
        self.initialize().await;
        let waited = started.elapsed();
        if waited > self.init_wait {
            tracing::warn!(waited_ms = waited.as_millis(), "token read held up by slow initialization");
        }
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Log in with username/password, then load the profile.
    ///
    /// State changes only when both calls succeed.
    ///
    /// # Errors
    ///
    /// Returns the login or profile failure; the session is left as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        self.initialize().await;

        let pair = self.backend.login(credentials).await.inspect_err(|e| {
            tracing::warn!(username = %credentials.username, error = %e, "login failed");
        })?;
        let user = self.backend.fetch_profile(&pair.access).await.inspect_err(|e| {
            tracing::warn!(error = %e, "profile fetch after login failed");
        })?;

        {
            let mut data = self.state.write().await;
            data.access_token = Some(pair.access.clone());
            data.refresh_token = Some(pair.refresh.clone());
            data.user = Some(user.clone());
        }
        self.persist(ACCESS_TOKEN_KEY, Some(&pair.access));
        self.persist(REFRESH_TOKEN_KEY, Some(&pair.refresh));
        self.mirror_cookie(Some(&pair.access));
        self.status.send_replace(SessionStatus::Authenticated);

        tracing::info!(username = %credentials.username, "logged in");
        Ok(user)
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` before any request when the form is
    /// invalid, otherwise the backend failure.
    pub async fn register(&self, registration: &Registration) -> Result<Value, AuthError> {
        registration.validate()?;
        let payload = self.backend.register(registration).await.inspect_err(|e| {
            tracing::warn!(username = %registration.username, error = %e, "registration failed");
        })?;
        tracing::info!(username = %registration.username, "registered");
        Ok(payload)
    }

    /// Clear memory, storage, and cookie. Returns the landing route.
    pub async fn logout(&self) -> &'static str {
        self.clear_all().await;
        tracing::info!("logged out");
        LANDING_ROUTE
    }

    /// Current access token, refreshing when only a refresh token is held.
    ///
    /// Never fails: `None` means the caller should proceed unauthenticated.
    pub async fn get_access_token(&self) -> Option<String> {
        match self.status() {
            SessionStatus::Uninitialized | SessionStatus::Loading => self.wait_for_init().await,
            SessionStatus::Authenticated | SessionStatus::Anonymous => {}
        }

        let (access, has_refresh) = {
            let data = self.state.read().await;
            (data.access_token.clone(), data.refresh_token.is_some())
        };
        if access.is_some() {
            return access;
        }
        if !has_refresh {
            tracing::debug!("no tokens held");
            return None;
        }
        self.refresh_access_token().await
    }

    /// Exchange the held refresh token for a new access token.
    ///
    /// Success commits the new token to memory, storage, and cookie. Any
    /// failure logs the session out. If a login replaced the session while
    /// the exchange was in flight, the outcome is dropped and the current
    /// access token is returned instead.
    pub async fn refresh_access_token(&self) -> Option<String> {
        let refresh = self.state.read().await.refresh_token.clone();
        let Some(refresh) = refresh else {
            tracing::debug!("refresh requested without a refresh token");
            return None;
        };

        let result = self.refresher.exchange(&refresh).await;

        let mut data = self.state.write().await;
        if data.refresh_token.as_deref() != Some(refresh.as_str()) {
            tracing::debug!("session replaced during refresh; discarding result");
            return data.access_token.clone();
        }
        let Ok(tokens) = result else {
            *data = SessionData::default();
            drop(data);
            self.clear_mirrors();
            return None;
        };

        data.access_token = Some(tokens.access.clone());
        if let Some(rotated) = &tokens.refresh {
            data.refresh_token = Some(rotated.clone());
        }
        let status = data.derived_status();
        drop(data);
        self.persist(ACCESS_TOKEN_KEY, Some(&tokens.access));
        if let Some(rotated) = &tokens.refresh {
            self.persist(REFRESH_TOKEN_KEY, Some(rotated));
        }
        self.mirror_cookie(Some(&tokens.access));
        if self.status().is_settled() {
            self.status.send_replace(status);
        }
        Some(tokens.access)
    }

    /// Drop the access token after the backend rejected it, keeping the
    /// refresh token so the next read triggers a refresh.
    pub async fn invalidate_access_token(&self) {
        let status = {
            let mut data = self.state.write().await;
            data.access_token = None;
            data.derived_status()
        };
        self.persist(ACCESS_TOKEN_KEY, None);
        self.mirror_cookie(None);
        if self.status().is_settled() {
            self.status.send_replace(status);
        }
        tracing::debug!("access token invalidated");
    }

    /// Forget in-memory state without touching storage or cookie.
    pub async fn dispose(&self) {
        *self.state.write().await = SessionData::default();
        self.status.send_replace(SessionStatus::Anonymous);
    }

    // =========================================================================
    // MIRRORS
    // =========================================================================

    async fn clear_all(&self) {
        *self.state.write().await = SessionData::default();
        self.clear_mirrors();
    }

    fn clear_mirrors(&self) {
        self.persist(ACCESS_TOKEN_KEY, None);
        self.persist(REFRESH_TOKEN_KEY, None);
        self.mirror_cookie(None);
        self.status.send_replace(SessionStatus::Anonymous);
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!(%key, error = %e, "durable storage write failed");
        }
    }

    fn mirror_cookie(&self, access: Option<&str>) {
        let cookie = match access {
            Some(token) => auth_cookie(token, &self.cookie_policy),
            None => cleared_auth_cookie(&self.cookie_policy),
        };
        self.cookies.write(cookie);
    }
}

#[async_trait::async_trait]
impl TokenSource for SessionStore {
    async fn access_token(&self) -> Option<String> {
        self.get_access_token().await
    }
}
