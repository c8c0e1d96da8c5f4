//! Request extractors shared by handlers.
//!
//! - [`auth::AuthUser`] -- the caller identity set by the upstream gateway.

pub mod auth;
