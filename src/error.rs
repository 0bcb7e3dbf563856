//! Error taxonomy shared by the session store, fetch wrapper, and binaries.
//!
//! DESIGN
//! ======
//! One `thiserror` enum per concern. Every variant carries a stable
//! `E_*` code through [`ErrorCode`] so the server and CLI can render
//! machine-readable failures without matching on message text.

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Stable code + retry hint for an error variant.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Configuration problems. Fatal at the call site.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The backend base URL environment variable is not set.
    #[error("{var} is not defined in your environment")]
    MissingBaseUrl { var: &'static str },

    /// An environment value could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingBaseUrl { .. } => "E_MISSING_BASE_URL",
            Self::InvalidValue { .. } => "E_CONFIG_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

// =============================================================================
// API
// =============================================================================

/// Failures of a request made through the fetch wrapper.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a status outside 2xx.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Network(String),

    /// The response body could not be read or decoded.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The request could not be built (e.g. a token with invalid header bytes).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status for backend-reported failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// Human-readable message (backend `detail` when available).
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::Network(msg) | Self::Decode(msg) | Self::InvalidRequest(msg) => msg,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Status { status: 401, .. } => "E_UNAUTHORIZED",
            Self::Status { status: 403, .. } => "E_FORBIDDEN",
            Self::Status { status: 404, .. } => "E_NOT_FOUND",
            Self::Status { .. } => "E_API_STATUS",
            Self::Network(_) => "E_NETWORK",
            Self::Decode(_) => "E_DECODE",
            Self::InvalidRequest(_) => "E_INVALID_REQUEST",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// AUTH
// =============================================================================

/// Login, registration, refresh, and profile failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The backend rejected the request.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The backend could not be reached.
    #[error("{0}")]
    Network(String),

    /// A 2xx response did not carry the expected payload.
    #[error("{0}")]
    MalformedResponse(String),

    /// Input failed local validation before any request was sent.
    #[error("{0}")]
    Validation(String),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, message } => Self::Rejected { status, message },
            ApiError::Network(msg) => Self::Network(msg),
            ApiError::Decode(msg) => Self::MalformedResponse(msg),
            ApiError::InvalidRequest(msg) => Self::Validation(msg),
        }
    }
}

impl ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "E_AUTH_REJECTED",
            Self::Network(_) => "E_NETWORK",
            Self::MalformedResponse(_) => "E_AUTH_MALFORMED",
            Self::Validation(_) => "E_VALIDATION",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Rejected { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// STORAGE
// =============================================================================

/// Durable mirror I/O failures. Logged and swallowed by the session store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage payload invalid: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "E_STORAGE_IO",
            Self::Serde(_) => "E_STORAGE_PAYLOAD",
        }
    }
}
