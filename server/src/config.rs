//! Server configuration parsed from environment variables.

use std::path::PathBuf;

use triptrack::{ClientConfig, ConfigError, ErrorCode};

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    #[error(transparent)]
    Client(#[from] ConfigError),

    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

impl ErrorCode for ServerConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Client(e) => e.error_code(),
            Self::InvalidPort(_) => "E_CONFIG_PARSE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub pages_dir: PathBuf,
    pub cookie_secure: bool,
    pub client: ClientConfig,
}

impl ServerConfig {
    /// Build server config from environment variables.
    ///
    /// Required:
    /// - `TRIPTRACK_API_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `TRIPTRACK_PAGES_DIR`: default `pages/` at the workspace root
    /// - `COOKIE_SECURE`: mark the `authToken` cookie `Secure`
    /// - everything [`ClientConfig::from_env`] reads
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL is missing or `PORT` is not a port.
    pub fn from_env() -> Result<Self, ServerConfigError> {
        let client = ClientConfig::from_env()?;
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse().map_err(|_| ServerConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };
        Ok(Self { port, pages_dir: pages_dir(), cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false), client })
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn pages_dir() -> PathBuf {
    std::env::var("TRIPTRACK_PAGES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../pages"))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
