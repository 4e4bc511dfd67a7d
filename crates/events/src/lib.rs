//! Domain event plumbing for the outreach service.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope published after a successful
//!   write.
//! - [`EventPersistence`]: background task that writes every event to the
//!   `events` table.

pub mod bus;
pub mod persistence;

pub use bus::{EventBus, PlatformEvent};
pub use persistence::{EventPersistence, PersistError};
