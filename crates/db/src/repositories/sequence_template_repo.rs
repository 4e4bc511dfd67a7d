//! Repository for the `sequence_templates` table.

use outreach_core::sequence::ValidatedSequenceTemplate;
use outreach_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::sequence_template::SequenceTemplate;

const COLUMNS: &str = "id, name, description, service_id, schedule_definition_id, \
     steps, version, is_active, created_by, created_at, updated_at";

/// Provides CRUD operations for sequence templates.
///
/// Writes only accept a [`ValidatedSequenceTemplate`], so an unvalidated
/// step list can never reach the table.
pub struct SequenceTemplateRepo;

impl SequenceTemplateRepo {
    /// Insert a new template, returning the created row.
    pub async fn create(
        pool: &PgPool,
        template: &ValidatedSequenceTemplate,
        created_by: Option<DbId>,
    ) -> Result<SequenceTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO sequence_templates \
                (name, description, service_id, schedule_definition_id, steps, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SequenceTemplate>(&query)
            .bind(template.name())
            .bind(template.description())
            .bind(template.service_id())
            .bind(template.schedule_definition_id())
            .bind(Json(template.steps()))
            .bind(template.is_active())
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a template by ID, active or not.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<SequenceTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sequence_templates WHERE id = $1");
        sqlx::query_as::<_, SequenceTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List templates ordered by name. Inactive ones are skipped unless
    /// `include_inactive` is set.
    pub async fn list(
        pool: &PgPool,
        include_inactive: bool,
    ) -> Result<Vec<SequenceTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sequence_templates \
             WHERE ($1 OR is_active = true) \
             ORDER BY name ASC, id ASC"
        );
        sqlx::query_as::<_, SequenceTemplate>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    /// Replace a template's fields and full step list. Increments version.
    /// `is_active` is only changed when the payload set it.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        template: &ValidatedSequenceTemplate,
    ) -> Result<Option<SequenceTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE sequence_templates SET \
                name = $2, \
                description = $3, \
                service_id = $4, \
                schedule_definition_id = $5, \
                steps = $6, \
                is_active = COALESCE($7, is_active), \
                version = version + 1, \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SequenceTemplate>(&query)
            .bind(id)
            .bind(template.name())
            .bind(template.description())
            .bind(template.service_id())
            .bind(template.schedule_definition_id())
            .bind(Json(template.steps()))
            .bind(template.requested_active())
            .fetch_optional(pool)
            .await
    }

    /// Soft-deactivate a template. Returns `false` if it was missing or
    /// already inactive.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sequence_templates SET is_active = false, updated_at = now() \
             WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
