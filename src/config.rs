//! Client configuration parsed from environment variables.

use std::time::Duration;

use crate::error::ConfigError;

pub const API_URL_VAR: &str = "TRIPTRACK_API_URL";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_COOKIE_MAX_AGE_SECS: i64 = 3600;
pub const DEFAULT_INIT_WAIT_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect_secs: u64,
    /// `None` leaves request duration to the network stack.
    pub request_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub api_base_url: String,
    pub timeouts: HttpTimeouts,
    /// Max-age for the `authToken` cookie, client mirror and server alike.
    pub cookie_max_age_secs: i64,
    /// Upper bound on how long token readers wait for in-flight initialization.
    pub init_wait_ms: u64,
}

impl ClientConfig {
    /// Config with defaults for everything except the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or not an http(s) URL.
    pub fn new(api_base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url)?,
            timeouts: HttpTimeouts { connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS, request_secs: None },
            cookie_max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
            init_wait_ms: DEFAULT_INIT_WAIT_MS,
        })
    }

    /// Build typed client config from environment variables.
    ///
    /// Required:
    /// - `TRIPTRACK_API_URL`
    ///
    /// Optional:
    /// - `TRIPTRACK_CONNECT_TIMEOUT_SECS`: default 10
    /// - `TRIPTRACK_REQUEST_TIMEOUT_SECS`: unset or 0 disables
    /// - `TRIPTRACK_COOKIE_MAX_AGE_SECS`: default 3600
    /// - `TRIPTRACK_INIT_WAIT_MS`: default 100; token reads held up longer log a warning
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(API_URL_VAR).map_err(|_| ConfigError::MissingBaseUrl { var: API_URL_VAR })?;
        Self::from_env_with_base(&raw)
    }

    /// Like [`ClientConfig::from_env`], with the base URL supplied by the caller
    /// (e.g. a CLI flag) and everything else read from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or malformed.
    pub fn from_env_with_base(api_base_url: &str) -> Result<Self, ConfigError> {
        let mut config = Self::new(api_base_url)?;
        config.timeouts.connect_secs = env_parse("TRIPTRACK_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS);
        config.timeouts.request_secs = match env_parse("TRIPTRACK_REQUEST_TIMEOUT_SECS", 0_u64) {
            0 => None,
            secs => Some(secs),
        };
        config.cookie_max_age_secs = env_parse("TRIPTRACK_COOKIE_MAX_AGE_SECS", DEFAULT_COOKIE_MAX_AGE_SECS);
        config.init_wait_ms = env_parse("TRIPTRACK_INIT_WAIT_MS", DEFAULT_INIT_WAIT_MS);
        Ok(config)
    }

    #[must_use]
    pub fn init_wait(&self) -> Duration {
        Duration::from_millis(self.init_wait_ms)
    }

    #[must_use]
    pub fn cookie_max_age(&self) -> time::Duration {
        time::Duration::seconds(self.cookie_max_age_secs)
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::MissingBaseUrl { var: API_URL_VAR });
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidValue { key: API_URL_VAR.to_owned(), value: raw.to_owned() });
    }
    Ok(trimmed.to_owned())
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
