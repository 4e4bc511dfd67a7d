//! Handlers for sequence templates.
//!
//! Every write runs the full sequence assembler on the request body before
//! touching the database. Events and activity entries are emitted after a
//! successful write and never fail the request.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use outreach_core::activity::{SequenceChange, ENTITY_SEQUENCE_TEMPLATE};
use outreach_core::error::CoreError;
use outreach_core::sequence::calendar::MAX_UTC_OFFSET_MINUTES;
use outreach_core::sequence::{
    self, compute_schedule, serialize_with_mirrors, CampaignSequenceStep, SendAt,
    ValidatedSequenceTemplate,
};
use outreach_core::types::{DbId, Timestamp};
use outreach_db::models::activity::NewActivity;
use outreach_db::models::sequence_template::SequenceTemplate;
use outreach_db::repositories::{ActivityRepo, ScheduleDefinitionRepo, SequenceTemplateRepo};
use outreach_events::PlatformEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const ENTITY_NAME: &str = "SequenceTemplate";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Body of `POST /{id}/schedule`.
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    /// Launch date in the schedule timezone.
    pub start_date: NaiveDate,
    /// Offset used when the template has no schedule definition.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// A stored template with its steps decoded.
#[derive(Debug, Serialize)]
pub struct SequenceTemplateView {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub service_id: Option<String>,
    pub schedule_definition_id: Option<DbId>,
    pub version: i32,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(serialize_with = "serialize_with_mirrors")]
    pub steps: Vec<CampaignSequenceStep>,
}

impl TryFrom<SequenceTemplate> for SequenceTemplateView {
    type Error = CoreError;

    fn try_from(row: SequenceTemplate) -> Result<Self, Self::Error> {
        let steps = row.decode_steps()?;
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            service_id: row.service_id,
            schedule_definition_id: row.schedule_definition_id,
            version: row.version,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            steps,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DispatchView {
    pub step_order: u32,
    pub day_offset: u64,
    pub local_date: NaiveDate,
    pub send_at: SendAt,
    /// Instant computed from delays and `send_at` alone.
    pub candidate_at: DateTime<Utc>,
    /// Instant after business-hours adjustment, if any applied.
    pub dispatch_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub template_id: DbId,
    pub utc_offset_minutes: i32,
    pub business_hours_applied: bool,
    pub dispatches: Vec<DispatchView>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Unwrap a JSON body, mapping parse failures to `INVALID_REQUEST`.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value).map_err(AppError::from)
}

async fn ensure_template_exists(pool: &sqlx::PgPool, id: DbId) -> AppResult<SequenceTemplate> {
    SequenceTemplateRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: ENTITY_NAME,
            id,
        }))
}

/// A referenced schedule definition must exist before the template is saved.
async fn ensure_schedule_definition(pool: &sqlx::PgPool, id: Option<DbId>) -> AppResult<()> {
    let Some(id) = id else {
        return Ok(());
    };
    if ScheduleDefinitionRepo::find_by_id(pool, id).await?.is_none() {
        return Err(CoreError::Validation(format!("schedule definition {id} does not exist")).into());
    }
    Ok(())
}

/// Publish a template event and record the matching activity entry.
///
/// Failures are logged and swallowed.
async fn emit_change(
    state: &AppState,
    auth: &AuthUser,
    change: SequenceChange,
    row: &SequenceTemplate,
    details: Value,
) {
    state.event_bus.publish(
        PlatformEvent::sequence_template(change, row.id)
            .with_actor(auth.user_id)
            .with_payload(details.clone()),
    );

    let entry = NewActivity {
        actor_user_id: Some(auth.user_id),
        action: change.action(),
        entity_type: ENTITY_SEQUENCE_TEMPLATE,
        entity_id: Some(row.id),
        details,
    };
    if let Err(e) = ActivityRepo::record(&state.pool, &entry).await {
        tracing::warn!(error = %e, %change, template_id = row.id, "Failed to record activity");
    }
}

fn change_details(template: &ValidatedSequenceTemplate, version: i32) -> Value {
    json!({
        "name": template.name(),
        "version": version,
        "step_count": template.steps().len(),
    })
}

// ---------------------------------------------------------------------------
// GET /sequence-templates
// ---------------------------------------------------------------------------

pub async fn list_templates(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let rows = SequenceTemplateRepo::list(&state.pool, params.include_inactive).await?;
    let items = rows
        .into_iter()
        .map(SequenceTemplateView::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(count = items.len(), "Listed sequence templates");
    Ok(Json(DataResponse { data: items }))
}

// ---------------------------------------------------------------------------
// POST /sequence-templates
// ---------------------------------------------------------------------------

pub async fn create_template(
    auth: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = json_body(body)?;
    let template = sequence::build(&payload)?;
    ensure_schedule_definition(&state.pool, template.schedule_definition_id()).await?;

    let row = SequenceTemplateRepo::create(&state.pool, &template, Some(auth.user_id)).await?;
    tracing::info!(
        id = row.id,
        name = %row.name,
        steps = template.steps().len(),
        user_id = auth.user_id,
        "Sequence template created"
    );

    emit_change(
        &state,
        &auth,
        SequenceChange::Created,
        &row,
        change_details(&template, row.version),
    )
    .await;

    let view = SequenceTemplateView::try_from(row)?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

// ---------------------------------------------------------------------------
// POST /sequence-templates/validate
// ---------------------------------------------------------------------------

/// Dry run: normalize and validate without persisting anything.
pub async fn validate_template(
    _auth: AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = json_body(body)?;
    let template = sequence::build(&payload)?;
    tracing::debug!(steps = template.steps().len(), "Sequence template validated");
    Ok(Json(DataResponse { data: template }))
}

// ---------------------------------------------------------------------------
// GET /sequence-templates/{id}
// ---------------------------------------------------------------------------

pub async fn get_template(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let row = ensure_template_exists(&state.pool, id).await?;
    let view = SequenceTemplateView::try_from(row)?;
    Ok(Json(DataResponse { data: view }))
}

// ---------------------------------------------------------------------------
// PUT /sequence-templates/{id}
// ---------------------------------------------------------------------------

/// Replace a template with a full new payload. Steps are re-validated from
/// scratch and replaced as a whole.
pub async fn update_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = json_body(body)?;
    let template = sequence::build(&payload)?;
    ensure_schedule_definition(&state.pool, template.schedule_definition_id()).await?;

    let row = SequenceTemplateRepo::update(&state.pool, id, &template)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: ENTITY_NAME,
            id,
        }))?;
    tracing::info!(id, version = row.version, user_id = auth.user_id, "Sequence template updated");

    emit_change(
        &state,
        &auth,
        SequenceChange::Updated,
        &row,
        change_details(&template, row.version),
    )
    .await;

    let view = SequenceTemplateView::try_from(row)?;
    Ok(Json(DataResponse { data: view }))
}

// ---------------------------------------------------------------------------
// DELETE /sequence-templates/{id}
// ---------------------------------------------------------------------------

/// Soft-deactivate. Deactivating an already inactive template is a no-op.
pub async fn deactivate_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !SequenceTemplateRepo::deactivate(&state.pool, id).await? {
        ensure_template_exists(&state.pool, id).await?;
        tracing::debug!(id, "Sequence template already inactive");
        return Ok(StatusCode::NO_CONTENT);
    }

    let row = ensure_template_exists(&state.pool, id).await?;
    tracing::info!(id, user_id = auth.user_id, "Sequence template deactivated");

    emit_change(
        &state,
        &auth,
        SequenceChange::Deactivated,
        &row,
        json!({ "name": row.name, "version": row.version }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// POST /sequence-templates/{id}/schedule
// ---------------------------------------------------------------------------

/// Compute the dispatch plan for a launch date.
///
/// With a schedule definition, its timezone is used and every instant is
/// moved into its business window. Without one, the request's UTC offset is
/// used and the calculator's instants are returned unchanged.
pub async fn schedule_template(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Result<Json<ScheduleRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let request = json_body(body)?;
    let row = ensure_template_exists(&state.pool, id).await?;
    let steps = row.decode_steps()?;

    let definition = match row.schedule_definition_id {
        Some(definition_id) => {
            let stored = ScheduleDefinitionRepo::find_by_id(&state.pool, definition_id)
                .await?
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "ScheduleDefinition",
                    id: definition_id,
                }))?;
            Some(stored.to_definition()?)
        }
        None => None,
    };

    let utc_offset_minutes = match &definition {
        Some(definition) => definition.utc_offset_minutes,
        None => request.utc_offset_minutes,
    };
    let tz = fixed_offset(utc_offset_minutes)?;
    let plan = compute_schedule(&steps, request.start_date, &tz)?;

    let dispatches = match &definition {
        Some(definition) => definition
            .apply(&plan)?
            .into_iter()
            .zip(&plan)
            .map(|(adjusted, dispatch)| DispatchView {
                step_order: dispatch.step_order,
                day_offset: dispatch.day_offset,
                local_date: dispatch.local_date,
                send_at: dispatch.send_at,
                candidate_at: adjusted.candidate_at,
                dispatch_at: adjusted.dispatch_at,
            })
            .collect(),
        None => plan
            .iter()
            .map(|dispatch| DispatchView {
                step_order: dispatch.step_order,
                day_offset: dispatch.day_offset,
                local_date: dispatch.local_date,
                send_at: dispatch.send_at,
                candidate_at: dispatch.dispatch_at,
                dispatch_at: dispatch.dispatch_at,
            })
            .collect(),
    };

    tracing::debug!(id, start_date = %request.start_date, "Computed dispatch schedule");
    Ok(Json(DataResponse {
        data: ScheduleView {
            template_id: id,
            utc_offset_minutes,
            business_hours_applied: definition.is_some(),
            dispatches,
        },
    }))
}

fn fixed_offset(minutes: i32) -> AppResult<FixedOffset> {
    if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(CoreError::Validation(format!(
            "utc_offset_minutes {minutes} is outside +/-{MAX_UTC_OFFSET_MINUTES}"
        ))
        .into());
    }
    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| CoreError::Validation(format!("invalid utc_offset_minutes {minutes}")).into())
}
