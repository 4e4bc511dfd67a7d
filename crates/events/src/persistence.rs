//! Durable event persistence.
//!
//! [`EventPersistence::run`] drains a bus subscription into the `events`
//! table until the [`EventBus`](crate::bus::EventBus) is dropped. Failures
//! are logged and never stop the loop.

use outreach_core::types::DbId;
use outreach_db::repositories::EventRepo;
use outreach_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Unknown event type '{0}'")]
    UnknownEventType(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Background service that persists platform events.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => match Self::persist(&pool, &event).await {
                    Ok(id) => {
                        tracing::debug!(event_id = id, event_type = %event.event_type, "Event persisted");
                    }
                    Err(PersistError::UnknownEventType(name)) => {
                        tracing::warn!(event_type = %name, "Skipping event with unregistered type");
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist event"
                        );
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event persistence lagged, events were lost");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    /// Resolve the event type and insert one `events` row.
    async fn persist(pool: &DbPool, event: &PlatformEvent) -> Result<DbId, PersistError> {
        let event_type = EventRepo::get_event_type_by_name(pool, &event.event_type)
            .await?
            .ok_or_else(|| PersistError::UnknownEventType(event.event_type.clone()))?;

        let id = EventRepo::insert(
            pool,
            event_type.id,
            event.source_entity_type.as_deref(),
            event.source_entity_id,
            event.actor_user_id,
            &event.payload,
        )
        .await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    #[tokio::test]
    async fn loop_exits_when_bus_is_dropped() {
        // Never connects: no event is published, so no query runs.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://outreach@localhost/unused")
            .unwrap();
        let bus = EventBus::default();
        let handle = tokio::spawn(EventPersistence::run(pool, bus.subscribe()));

        drop(bus);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("persistence loop should stop")
            .unwrap();
    }

    #[test]
    fn unknown_type_error_names_the_event() {
        let err = PersistError::UnknownEventType("nope.event".to_string());
        assert_eq!(err.to_string(), "Unknown event type 'nope.event'");
    }
}
