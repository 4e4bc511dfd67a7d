//! Outreach core domain logic.
//!
//! Everything in this crate is pure: no database, no network, no async.
//! The `db`, `events` and `api` crates depend on it, never the reverse.

pub mod activity;
pub mod error;
pub mod sequence;
pub mod types;
