//! Trip-tracking client core.
//!
//! SYSTEM CONTEXT
//! ==============
//! Shared by the `triptrack-server` backend-for-frontend and the
//! `triptrack-cli` terminal front end. Owns the token lifecycle (session
//! store + refresher), the authenticated fetch wrapper, the cookie-based
//! route guard decision, and the trip resources exposed by the backend.

pub mod config;
pub mod error;
pub mod guard;
pub mod net;
pub mod session;
pub mod trips;

pub use config::ClientConfig;
pub use error::{ApiError, AuthError, ConfigError, ErrorCode, StorageError};
pub use net::api::{ApiClient, RequestOptions, ResponseBody};
pub use session::store::SessionStore;
