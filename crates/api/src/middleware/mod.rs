//! Request extractors.
//!
//! - [`auth::AuthUser`]: the acting user, taken from a JWT Bearer token.

pub mod auth;
