//! The `authToken` cookie: construction, parsing, and the client-side mirror.
//!
//! The cookie carries the current access token so the route guard can make
//! a presence-only decision on each page request. The same builders serve
//! the client mirror (readable, `SameSite=Strict`) and the server's
//! `Set-Cookie` (`HttpOnly`, `SameSite=Lax`).

use std::sync::{Mutex, PoisonError};

use cookie::{Cookie, SameSite};
use time::OffsetDateTime;

#[cfg(test)]
#[path = "cookie_test.rs"]
mod tests;

pub const AUTH_COOKIE_NAME: &str = "authToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub max_age: time::Duration,
    pub same_site: SameSite,
    pub http_only: bool,
    pub secure: bool,
}

impl CookiePolicy {
    /// Mirror written by the client session store.
    #[must_use]
    pub fn client_mirror(max_age: time::Duration) -> Self {
        Self { max_age, same_site: SameSite::Strict, http_only: false, secure: false }
    }

    /// Cookie issued by the server after a proxied login.
    #[must_use]
    pub fn server(max_age: time::Duration, secure: bool) -> Self {
        Self { max_age, same_site: SameSite::Lax, http_only: true, secure }
    }
}

/// `authToken=<token>; Path=/; Max-Age=...` under `policy`.
#[must_use]
pub fn auth_cookie(token: impl Into<String>, policy: &CookiePolicy) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, token.into()))
        .path("/")
        .max_age(policy.max_age)
        .same_site(policy.same_site)
        .http_only(policy.http_only)
        .secure(policy.secure)
        .build()
}

/// Empty value with `Max-Age=0`, which tells the browser to drop it.
#[must_use]
pub fn cleared_auth_cookie(policy: &CookiePolicy) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .same_site(policy.same_site)
        .http_only(policy.http_only)
        .secure(policy.secure)
        .build()
}

/// Non-empty `authToken` value from a `Cookie` request header.
#[must_use]
pub fn auth_token_from_header(header: &str) -> Option<String> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|c| c.name() == AUTH_COOKIE_NAME)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// MIRROR
// =============================================================================

/// Where the session store writes the cookie.
pub trait CookieMirror: Send + Sync {
    fn write(&self, cookie: Cookie<'static>);

    /// Current live `authToken` value, if any.
    fn read(&self) -> Option<String>;
}

/// In-process cookie slot honoring `Max-Age`.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    slot: Mutex<Option<(Cookie<'static>, OffsetDateTime)>>,
}

impl MemoryCookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last cookie written, live or not.
    #[must_use]
    pub fn last_written(&self) -> Option<Cookie<'static>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).as_ref().map(|(c, _)| c.clone())
    }

    /// `Cookie` request header equivalent, for feeding the route guard.
    #[must_use]
    pub fn request_header(&self) -> Option<String> {
        self.read().map(|token| format!("{AUTH_COOKIE_NAME}={token}"))
    }
}

impl CookieMirror for MemoryCookieJar {
    fn write(&self, cookie: Cookie<'static>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((cookie, OffsetDateTime::now_utc()));
    }

    fn read(&self) -> Option<String> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let (cookie, written_at) = slot.as_ref()?;
        if cookie.value().is_empty() {
            return None;
        }
        if let Some(max_age) = cookie.max_age() {
            if OffsetDateTime::now_utc() >= *written_at + max_age {
                return None;
            }
        }
        Some(cookie.value().to_owned())
    }
}
