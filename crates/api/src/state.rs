use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: the pool is reference counted and everything else sits
/// behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: outreach_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Bus that sequence template changes are published on.
    pub event_bus: Arc<outreach_events::EventBus>,
}
