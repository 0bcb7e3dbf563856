//! In-process server with a canned auth backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use triptrack::AuthError;
use triptrack::net::backend::{AuthBackend, Credentials, Registration};
use triptrack::session::cookie::CookiePolicy;
use triptrack::session::{RefreshedTokens, TokenPair, UserProfile};

use crate::state::AppState;

pub(crate) const GOOD_TOKEN: &str = "acc-good";

#[derive(Default)]
pub(crate) struct CannedBackend {
    pub offline: AtomicBool,
}

impl CannedBackend {
    fn reachable(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::Network("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for CannedBackend {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, AuthError> {
        self.reachable()?;
        match (credentials.username.as_str(), credentials.password.as_str()) {
            ("alice", "pw") => Ok(TokenPair { access: GOOD_TOKEN.into(), refresh: "ref-good".into() }),
            ("nodetail", _) => Err(AuthError::Rejected { status: 400, message: "Request failed with status 400".into() }),
            _ => Err(AuthError::Rejected {
                status: 401,
                message: "No active account found with the given credentials".into(),
            }),
        }
    }

    async fn register(&self, registration: &Registration) -> Result<Value, AuthError> {
        self.reachable()?;
        if registration.username == "taken" {
            return Err(AuthError::Rejected { status: 400, message: "A user with that username already exists.".into() });
        }
        Ok(json!({"id": 5, "username": registration.username}))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<RefreshedTokens, AuthError> {
        Err(AuthError::Rejected { status: 401, message: "Token is invalid or expired".into() })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        self.reachable()?;
        if access_token == GOOD_TOKEN {
            Ok(UserProfile::from_value(json!({"id": 1, "name": "Alice"})).unwrap())
        } else {
            Err(AuthError::Rejected { status: 401, message: "Given token not valid for any token type".into() })
        }
    }
}

pub(crate) struct TestServer {
    pub base_url: String,
    pub backend: Arc<CannedBackend>,
    pub client: reqwest::Client,
    pages_dir: PathBuf,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.pages_dir);
    }
}

fn write_pages() -> PathBuf {
    let root = std::env::temp_dir().join(format!("triptrack-pages-{}", uuid::Uuid::new_v4()));
    for (dir, title) in [("", "Home"), ("login", "Login"), ("register", "Register"), ("dashboard", "Dashboard")] {
        let path = root.join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("index.html"), format!("<h1>{title}</h1>")).unwrap();
    }
    root
}

pub(crate) async fn spawn_server() -> TestServer {
    let backend = Arc::new(CannedBackend::default());
    let pages_dir = write_pages();
    let policy = CookiePolicy::server(triptrack::ClientConfig::new("http://backend.test").unwrap().cookie_max_age(), false);
    let state = AppState::new(backend.clone(), policy, pages_dir.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = super::app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build().unwrap();
    TestServer { base_url: format!("http://{addr}"), backend, client, pages_dir }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// `Set-Cookie` header value of a response.
pub(crate) fn set_cookie(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}
