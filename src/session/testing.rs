//! Scripted auth backend for session tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::net::backend::{AuthBackend, Credentials, Registration};
use crate::session::cookie::MemoryCookieJar;
use crate::session::storage::MemoryStorage;
use crate::session::store::SessionStore;
use crate::session::{RefreshedTokens, TokenPair, UserProfile};

#[derive(Default)]
pub(crate) struct Calls {
    pub login: AtomicUsize,
    pub register: AtomicUsize,
    pub refresh: AtomicUsize,
    pub profile: AtomicUsize,
}

impl Calls {
    pub fn login(&self) -> usize {
        self.login.load(Ordering::SeqCst)
    }
    pub fn register(&self) -> usize {
        self.register.load(Ordering::SeqCst)
    }
    pub fn refresh(&self) -> usize {
        self.refresh.load(Ordering::SeqCst)
    }
    pub fn profile(&self) -> usize {
        self.profile.load(Ordering::SeqCst)
    }
}

/// Backend whose token validity is a pair of in-memory tables.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    pub calls: Calls,
    /// Access tokens `fetch_profile` accepts.
    pub valid_access: Mutex<HashSet<String>>,
    /// Refresh token to the access token (and optional rotated refresh) it yields.
    pub valid_refresh: Mutex<HashMap<String, (String, Option<String>)>>,
    /// username/password to issued pair.
    pub accounts: HashMap<(String, String), TokenPair>,
    pub unreachable: AtomicBool,
    pub profile_delay: Option<Duration>,
    pub refresh_delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_access(self, token: &str) -> Self {
        self.valid_access.lock().unwrap().insert(token.to_owned());
        self
    }

    pub fn accept_refresh(self, refresh: &str, new_access: &str) -> Self {
        self.valid_refresh.lock().unwrap().insert(refresh.to_owned(), (new_access.to_owned(), None));
        self
    }

    pub fn rotate_refresh(self, refresh: &str, new_access: &str, new_refresh: &str) -> Self {
        self.valid_refresh
            .lock()
            .unwrap()
            .insert(refresh.to_owned(), (new_access.to_owned(), Some(new_refresh.to_owned())));
        self
    }

    pub fn account(mut self, username: &str, password: &str, access: &str, refresh: &str) -> Self {
        self.accounts.insert(
            (username.to_owned(), password.to_owned()),
            TokenPair { access: access.to_owned(), refresh: refresh.to_owned() },
        );
        self
    }

    pub fn slow_profile(mut self, delay: Duration) -> Self {
        self.profile_delay = Some(delay);
        self
    }

    pub fn slow_refresh(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    pub fn go_offline(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), AuthError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AuthError::Network("connection refused".to_owned()));
        }
        Ok(())
    }
}

pub(crate) fn profile() -> UserProfile {
    UserProfile::from_value(json!({"id": 1, "name": "Alice", "email": "alice@example.test"})).unwrap()
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, AuthError> {
        self.calls.login.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        let key = (credentials.username.clone(), credentials.password.clone());
        let pair = self.accounts.get(&key).cloned().ok_or_else(|| AuthError::Rejected {
            status: 401,
            message: "No active account found with the given credentials".to_owned(),
        })?;
        self.valid_access.lock().unwrap().insert(pair.access.clone());
        Ok(pair)
    }

    async fn register(&self, registration: &Registration) -> Result<Value, AuthError> {
        registration.validate()?;
        self.calls.register.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        if registration.username == "taken" {
            return Err(AuthError::Rejected {
                status: 400,
                message: "A user with that username already exists.".to_owned(),
            });
        }
        Ok(json!({"id": 2, "username": registration.username}))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, AuthError> {
        self.calls.refresh.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.refresh_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_reachable()?;
        let (access, refresh) = self.valid_refresh.lock().unwrap().get(refresh_token).cloned().ok_or_else(|| {
            AuthError::Rejected { status: 401, message: "Token is invalid or expired".to_owned() }
        })?;
        self.valid_access.lock().unwrap().insert(access.clone());
        Ok(RefreshedTokens { access, refresh })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        self.calls.profile.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.profile_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_reachable()?;
        if self.valid_access.lock().unwrap().contains(access_token) {
            Ok(profile())
        } else {
            Err(AuthError::Rejected { status: 401, message: "Given token not valid for any token type".to_owned() })
        }
    }
}

/// Store wired to in-memory mirrors, plus handles to inspect them.
pub(crate) struct Harness {
    pub store: Arc<SessionStore>,
    pub backend: Arc<ScriptedBackend>,
    pub storage: Arc<MemoryStorage>,
    pub cookies: Arc<MemoryCookieJar>,
}

pub(crate) fn harness(backend: ScriptedBackend, storage: MemoryStorage) -> Harness {
    let mut config = ClientConfig::new("http://backend.test").unwrap();
    config.init_wait_ms = 500;
    let backend = Arc::new(backend);
    let storage = Arc::new(storage);
    let cookies = Arc::new(MemoryCookieJar::new());
    let store = Arc::new(SessionStore::new(backend.clone(), storage.clone(), cookies.clone(), &config));
    Harness { store, backend, storage, cookies }
}
