//! Authenticated fetch wrapper.
//!
//! SYSTEM CONTEXT
//! ==============
//! UI-facing data calls (trip listing, creation) go through
//! [`ApiClient::fetch_with_auth`], which asks a [`TokenSource`] for the
//! current access token. The auth endpoints themselves use
//! [`ApiClient::fetch_api`], the same pipeline without a token.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx responses become `ApiError::Status` carrying the backend `detail`
//! when the body is JSON, the raw text otherwise. A missing token is not an
//! error: the request goes out unauthenticated and the backend decides.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigError};

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

// =============================================================================
// TOKEN SOURCE
// =============================================================================

/// Supplies the bearer token for an outbound request.
///
/// Implementations never fail; `None` means "send unauthenticated".
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// A token already in hand (e.g. read from a request cookie).
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// Method, optional JSON body, and caller headers for one request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { method: Method::GET, body: None, headers: HeaderMap::new() }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn post(body: Value) -> Self {
        Self { method: Method::POST, body: Some(body), headers: HeaderMap::new() }
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a caller header. Caller headers win over the wrapper's defaults.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Decoded success body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// `204 No Content`.
    Empty,
    /// Body served with a JSON content type.
    Json(Value),
    /// Any other body, verbatim.
    Text(String),
}

impl ResponseBody {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// JSON view of the body; `Empty` maps to `null`, text to a JSON string.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Deserialize a JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if the body is not JSON of the expected shape.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Self::Text(text) => serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string())),
            other => serde_json::from_value(other.into_value()).map_err(|e| ApiError::Decode(e.to_string())),
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client bound to the backend base URL. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
}

impl ApiClient {
    /// Build the shared HTTP client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(config.timeouts.connect_secs));
        if let Some(secs) = config.timeouts.request_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: Arc::from(config.api_base_url.as_str()) })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute endpoints pass through; anything else is appended to the base URL.
    #[must_use]
    pub fn resolve(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http") {
            endpoint.to_owned()
        } else {
            format!("{}{endpoint}", self.base_url)
        }
    }

    /// Perform a request with the current bearer token attached.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` for non-2xx responses, `ApiError::Network`
    /// when no response arrives, and `ApiError::Decode` for unreadable bodies.
    pub async fn fetch_with_auth<T>(
        &self,
        endpoint: &str,
        tokens: &T,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError>
    where
        T: TokenSource + ?Sized,
    {
        let token = tokens.access_token().await;
        if token.is_none() {
            tracing::warn!(%endpoint, "auth request without a token");
        }
        self.send(endpoint, token.as_deref(), options).await
    }

    /// Perform a request without a bearer token.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::fetch_with_auth`].
    pub async fn fetch_api(&self, endpoint: &str, options: RequestOptions) -> Result<ResponseBody, ApiError> {
        self.send(endpoint, None, options).await
    }

    /// Request with an explicit bearer token, bypassing any token source.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::fetch_with_auth`].
    pub async fn fetch_with_token(
        &self,
        endpoint: &str,
        token: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        self.send(endpoint, Some(token), options).await
    }

    async fn send(&self, endpoint: &str, token: Option<&str>, options: RequestOptions) -> Result<ResponseBody, ApiError> {
        let url = self.resolve(endpoint);
        let RequestOptions { method, body, headers } = options;
        let headers = build_headers(token, body.is_some(), headers)?;

        tracing::debug!(%method, %url, token = if token.is_some() { "present" } else { "missing" }, "api request");

        let mut request = self.http.request(method, &url).headers(headers);
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(%url, error = %e, "api request failed");
            ApiError::Network(e.to_string())
        })?;

        read_response(&url, response).await
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Wrapper defaults first, then caller headers replace any name they set.
fn build_headers(token: Option<&str>, has_body: bool, caller: HeaderMap) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    if has_body {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::InvalidRequest("access token is not a valid header value".to_owned()))?;
        headers.insert(AUTHORIZATION, value);
    }
    for name in caller.keys() {
        headers.remove(name);
    }
    headers.extend(caller);
    Ok(headers)
}

async fn read_response(url: &str, response: reqwest::Response) -> Result<ResponseBody, ApiError> {
    let status = response.status();

    if !status.is_success() {
        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = error_message(code, &body);
        tracing::warn!(%url, status = code, %message, "api error response");
        return Err(ApiError::Status { status: code, message });
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(ResponseBody::Empty);
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    let text = response.text().await.map_err(|e| ApiError::Decode(e.to_string()))?;

    if is_json {
        serde_json::from_str(&text)
            .map(ResponseBody::Json)
            .map_err(|e| ApiError::Decode(e.to_string()))
    } else {
        Ok(ResponseBody::Text(text))
    }
}

/// Message for a non-2xx body: JSON `detail`, else raw text, else the status.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => json
            .get("detail")
            .and_then(detail_text)
            .unwrap_or_else(|| format!("Request failed with status {status}")),
        Err(_) if !body.trim().is_empty() => body.to_owned(),
        Err(_) => format!("HTTP error! status: {status}"),
    }
}

fn detail_text(detail: &Value) -> Option<String> {
    match detail {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
