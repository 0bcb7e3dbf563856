//! Backend HTTP plumbing.
//!
//! ARCHITECTURE
//! ============
//! `api` holds the fetch wrapper every backend call goes through: URL
//! resolution, bearer/content-type headers, and error normalization.
//! `backend` layers the auth endpoints on top of it.

pub mod api;
pub mod backend;

#[cfg(test)]
pub(crate) mod testing;
