//! Field normalization for loosely-typed sequence payloads.
//!
//! Clients send steps in several shapes: flat or nested under `template`,
//! camelCase or snake_case, current or legacy field names. Every field is
//! resolved through an ordered alias list in [`aliases`]; the first key that
//! is present with a non-null value wins. The input is never mutated.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::DbId;

use super::step::Attachment;

// ---------------------------------------------------------------------------
// Alias resolution tables
// ---------------------------------------------------------------------------

/// Ordered alias lists. Resolution order is part of the request contract.
pub mod aliases {
    /// Step position.
    pub const ORDER: &[&str] = &["order", "step_number", "stepNumber", "step_order", "stepOrder"];

    pub const CHANNEL: &[&str] = &["communicationType", "communication_type", "channel"];

    pub const BODY: &[&str] = &["message", "body"];

    pub const SUBJECT: &[&str] = &["subject"];

    /// Canonical delay keys. Checked before [`LEGACY_WAIT_DAYS`].
    pub const DELAY_DAYS: &[&str] = &["delayDays", "delay_days"];

    /// Legacy delay keys. Only consulted when no canonical delay is present.
    pub const LEGACY_WAIT_DAYS: &[&str] = &["waitDays", "wait_days"];

    /// Canonical time-of-day keys. Checked before [`LEGACY_SEND_TIME`].
    pub const SEND_AT: &[&str] = &["sendAt", "send_at"];

    pub const LEGACY_SEND_TIME: &[&str] = &["sendTime", "send_time"];

    pub const CONTENT_TEMPLATE_ID: &[&str] = &[
        "templateId",
        "content_template_id",
        "contentTemplateId",
        "template_id",
    ];

    pub const BRANCH_CONDITIONS: &[&str] = &["branchConditions", "branch_conditions"];

    pub const ATTACHMENTS: &[&str] = &["attachments"];

    // -- Template-level fields ---------------------------------------------

    pub const NAME: &[&str] = &["name"];
    pub const DESCRIPTION: &[&str] = &["description"];
    pub const SERVICE_ID: &[&str] = &["serviceId", "service_id"];
    pub const SCHEDULE_DEFINITION_ID: &[&str] =
        &["scheduleDefinitionId", "schedule_definition_id"];
    pub const IS_ACTIVE: &[&str] = &["isActive", "is_active"];
    pub const STEPS: &[&str] = &["steps"];
}

/// Canonical field names used when reporting a value of the wrong type.
pub mod fields {
    pub const ORDER: &str = "order";
    pub const CHANNEL: &str = "channel";
    pub const BODY: &str = "body";
    pub const SUBJECT: &str = "subject";
    pub const DELAY_DAYS: &str = "delay_days";
    pub const SEND_AT: &str = "send_at";
    pub const CONTENT_TEMPLATE_ID: &str = "content_template_id";
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One step after alias resolution, before type validation.
///
/// Values that were present but of the wrong JSON type are not coerced;
/// their canonical field names are listed in `malformed` so the assembler
/// can report them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepDraft {
    pub order: Option<i64>,
    pub channel: Option<String>,
    pub content_template_id: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub delay_days: Option<i64>,
    pub send_at: Option<String>,
    pub branch_conditions: Option<Value>,
    pub attachments: Vec<Attachment>,
    pub malformed: Vec<&'static str>,
}

/// Template-level fields plus the step drafts of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_id: Option<String>,
    pub schedule_definition_id: Option<DbId>,
    pub is_active: Option<bool>,
    pub steps: Vec<StepDraft>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a full request body.
///
/// Accepts either a flat object (`{name, steps, ...}`) or a nested one
/// (`{template: {name, ...}, steps: [...]}`). In the nested form, steps may
/// also sit inside `template`. Step entries that are not objects are
/// skipped, so the step count is not preserved for malformed input.
pub fn normalize_payload(payload: &Value) -> Result<NormalizedPayload, CoreError> {
    let root = payload.as_object().ok_or_else(|| {
        CoreError::InvalidRequest("request body must be a JSON object".to_string())
    })?;

    let template = match root.get("template") {
        Some(Value::Object(inner)) => inner,
        _ => root,
    };

    let steps_value = resolve(root, aliases::STEPS).or_else(|| resolve(template, aliases::STEPS));
    let steps = match steps_value {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_object)
            .map(normalize_step)
            .collect(),
        _ => Vec::new(),
    };

    Ok(NormalizedPayload {
        name: resolve_string(template, aliases::NAME),
        description: resolve_string(template, aliases::DESCRIPTION),
        service_id: resolve(template, aliases::SERVICE_ID).and_then(scalar_to_string),
        schedule_definition_id: resolve(template, aliases::SCHEDULE_DEFINITION_ID)
            .and_then(as_integer),
        is_active: resolve(template, aliases::IS_ACTIVE).and_then(Value::as_bool),
        steps,
    })
}

/// Normalize a single step entry.
pub fn normalize_step(entry: &Map<String, Value>) -> StepDraft {
    let mut malformed = Vec::new();

    let order = integer_field(entry, aliases::ORDER, fields::ORDER, &mut malformed);

    let delay_days = match resolve(entry, aliases::DELAY_DAYS) {
        Some(_) => integer_field(entry, aliases::DELAY_DAYS, fields::DELAY_DAYS, &mut malformed),
        None => integer_field(
            entry,
            aliases::LEGACY_WAIT_DAYS,
            fields::DELAY_DAYS,
            &mut malformed,
        ),
    };

    let send_at = match resolve(entry, aliases::SEND_AT) {
        Some(_) => string_field(entry, aliases::SEND_AT, fields::SEND_AT, &mut malformed),
        None => string_field(
            entry,
            aliases::LEGACY_SEND_TIME,
            fields::SEND_AT,
            &mut malformed,
        ),
    };

    let channel = string_field(entry, aliases::CHANNEL, fields::CHANNEL, &mut malformed);
    let subject = string_field(entry, aliases::SUBJECT, fields::SUBJECT, &mut malformed);
    let body = string_field(entry, aliases::BODY, fields::BODY, &mut malformed);

    // A blank id is treated as absent so every step stays addressable.
    let content_template_id = match resolve(entry, aliases::CONTENT_TEMPLATE_ID) {
        Some(value) => match scalar_to_string(value) {
            Some(id) if id.trim().is_empty() => Uuid::new_v4().to_string(),
            Some(id) => id,
            None => {
                malformed.push(fields::CONTENT_TEMPLATE_ID);
                String::new()
            }
        },
        None => Uuid::new_v4().to_string(),
    };

    let attachments = match resolve(entry, aliases::ATTACHMENTS) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(attachment_from)
            .collect(),
        _ => Vec::new(),
    };

    StepDraft {
        order,
        channel,
        content_template_id,
        subject,
        body,
        delay_days,
        send_at,
        branch_conditions: resolve(entry, aliases::BRANCH_CONDITIONS).cloned(),
        attachments,
        malformed,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// First non-null value among `keys`, in order.
fn resolve<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

fn resolve_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    resolve(map, keys).and_then(Value::as_str).map(str::to_string)
}

fn string_field(
    map: &Map<String, Value>,
    keys: &[&str],
    field: &'static str,
    malformed: &mut Vec<&'static str>,
) -> Option<String> {
    let value = resolve(map, keys)?;
    match value.as_str() {
        Some(s) => Some(s.to_string()),
        None => {
            malformed.push(field);
            None
        }
    }
}

fn integer_field(
    map: &Map<String, Value>,
    keys: &[&str],
    field: &'static str,
    malformed: &mut Vec<&'static str>,
) -> Option<i64> {
    let value = resolve(map, keys)?;
    let parsed = as_integer(value);
    if parsed.is_none() {
        malformed.push(field);
    }
    parsed
}

/// Integers, integral floats (`2.0`) and integer strings (`"2"`).
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn attachment_from(map: &Map<String, Value>) -> Attachment {
    Attachment {
        id: scalar_field(map, &["id"]),
        name: scalar_field(map, &["name"]),
        kind: scalar_field(map, &["type"]),
        size: scalar_field(map, &["size"]),
        web_url: scalar_field(map, &["webUrl", "web_url"]),
        category: scalar_field(map, &["category"]),
    }
}

fn scalar_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    resolve(map, keys).and_then(scalar_to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
