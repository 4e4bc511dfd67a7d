//! Repository for the `schedule_definitions` table.

use outreach_core::types::DbId;
use sqlx::PgPool;

use crate::models::schedule_definition::ScheduleDefinitionRow;

const COLUMNS: &str = "id, name, utc_offset_minutes, business_start, business_end, \
     business_days, holidays, created_at, updated_at";

pub struct ScheduleDefinitionRepo;

impl ScheduleDefinitionRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ScheduleDefinitionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM schedule_definitions WHERE id = $1");
        sqlx::query_as::<_, ScheduleDefinitionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
