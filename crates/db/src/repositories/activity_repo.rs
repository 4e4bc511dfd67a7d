//! Repository for the `activity_log` table.

use outreach_core::types::DbId;
use sqlx::PgPool;

use crate::models::activity::NewActivity;

/// Append-only access to the activity log.
pub struct ActivityRepo;

impl ActivityRepo {
    /// Record an activity entry, returning its ID.
    pub async fn record(pool: &PgPool, entry: &NewActivity<'_>) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO activity_log \
                (actor_user_id, action, entity_type, entity_id, details) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(entry.actor_user_id)
        .bind(entry.action)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.details)
        .fetch_one(pool)
        .await
    }
}
