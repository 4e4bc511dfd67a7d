//! Sequence assembly: the single entry point used on create and update.
//!
//! Runs normalization, per-step field checks, ordering validation and branch
//! validation in that order and stops at the first failure. A sequence is
//! either fully valid or rejected; there is no partial result.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::DbId;

use super::branching::validate_branches;
use super::normalize::{normalize_payload, NormalizedPayload, StepDraft};
use super::ordering::validate_ordering;
use super::step::{
    serialize_with_mirrors, BranchConditions, CampaignSequenceStep, Channel, SendAt,
};

/// Maximum length for a sequence template name.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length for a sequence template description.
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Maximum number of steps in one sequence.
pub const MAX_STEPS_PER_SEQUENCE: usize = 500;

/// A fully validated sequence template, ready for persistence.
///
/// Fields are private so a value can only come out of [`build`] or
/// [`build_from`] and always satisfies every sequence invariant. Serializes
/// with snake_case keys and the legacy step mirrors filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedSequenceTemplate {
    name: String,
    description: Option<String>,
    service_id: Option<String>,
    schedule_definition_id: Option<DbId>,
    /// `None` when the payload did not say.
    #[serde(serialize_with = "serialize_active")]
    is_active: Option<bool>,
    #[serde(serialize_with = "serialize_with_mirrors")]
    steps: Vec<CampaignSequenceStep>,
}

impl ValidatedSequenceTemplate {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn service_id(&self) -> Option<&str> {
        self.service_id.as_deref()
    }

    pub fn schedule_definition_id(&self) -> Option<DbId> {
        self.schedule_definition_id
    }

    /// Active flag for a new template. Defaults to `true`.
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }

    /// Active flag as given in the payload. An update that leaves it out
    /// keeps the stored value.
    pub fn requested_active(&self) -> Option<bool> {
        self.is_active
    }

    pub fn steps(&self) -> &[CampaignSequenceStep] {
        &self.steps
    }
}

/// Normalize and validate a raw request payload.
pub fn build(payload: &Value) -> Result<ValidatedSequenceTemplate, CoreError> {
    build_from(normalize_payload(payload)?)
}

/// Validate an already normalized payload.
pub fn build_from(payload: NormalizedPayload) -> Result<ValidatedSequenceTemplate, CoreError> {
    let name = validate_name(payload.name.as_deref())?;

    if let Some(description) = &payload.description {
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(CoreError::Validation(format!(
                "Description too long: {} chars (max {MAX_DESCRIPTION_LEN})",
                description.len()
            )));
        }
    }

    if payload.steps.is_empty() {
        return Err(CoreError::Validation(
            "sequence must contain at least one step".to_string(),
        ));
    }
    if payload.steps.len() > MAX_STEPS_PER_SEQUENCE {
        return Err(CoreError::Validation(format!(
            "sequence has {} steps, exceeding the maximum of {MAX_STEPS_PER_SEQUENCE}",
            payload.steps.len()
        )));
    }

    let steps = payload
        .steps
        .into_iter()
        .enumerate()
        .map(|(index, draft)| finalize_step(index + 1, draft))
        .collect::<Result<Vec<_>, _>>()?;

    validate_ordering(&steps)?;
    validate_branches(&steps)?;

    Ok(ValidatedSequenceTemplate {
        name,
        description: payload.description,
        service_id: payload.service_id,
        schedule_definition_id: payload.schedule_definition_id,
        is_active: payload.is_active,
        steps,
    })
}

fn serialize_active<S: Serializer>(
    value: &Option<bool>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_bool(value.unwrap_or(true))
}

fn validate_name(name: Option<&str>) -> Result<String, CoreError> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Sequence name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Sequence name too long: {} chars (max {MAX_NAME_LEN})",
            name.len()
        )));
    }
    Ok(name.to_string())
}

/// Turn a draft into a typed step. `position` is the 1-based list position,
/// used only to point error messages at the right entry.
fn finalize_step(position: usize, draft: StepDraft) -> Result<CampaignSequenceStep, CoreError> {
    if let Some(field) = draft.malformed.first() {
        return Err(CoreError::Validation(format!(
            "step {position}: {field} has an invalid type"
        )));
    }

    let order = match draft.order {
        None => {
            return Err(CoreError::Validation(format!(
                "step {position}: order is required"
            )))
        }
        // Out-of-range orders can never be sequential.
        Some(order) => u32::try_from(order)
            .map_err(|_| CoreError::Validation(super::ordering::ORDERING_ERROR.to_string()))?,
    };

    let channel = match draft.channel.as_deref() {
        Some(raw) => Channel::parse(raw)?,
        None => {
            return Err(CoreError::Validation(format!(
                "step {position}: channel is required"
            )))
        }
    };

    let send_at = match draft.send_at.as_deref() {
        Some(raw) => SendAt::parse(raw)?,
        None => {
            return Err(CoreError::Validation(format!(
                "step {position}: send_at is required"
            )))
        }
    };

    let subject = draft.subject.filter(|s| !s.trim().is_empty());
    if channel.requires_subject() && subject.is_none() {
        return Err(CoreError::Validation(format!(
            "step {position}: subject is required for email steps"
        )));
    }

    let delay_days = u32::try_from(draft.delay_days.unwrap_or(0)).map_err(|_| {
        CoreError::Validation(format!(
            "step {position}: delay_days must be a non-negative whole number"
        ))
    })?;

    let branch_conditions = match &draft.branch_conditions {
        Some(raw) => BranchConditions::parse(raw)?,
        None => BranchConditions::default(),
    };

    Ok(CampaignSequenceStep {
        order,
        channel,
        content_template_id: draft.content_template_id,
        subject,
        body: draft.body,
        delay_days,
        send_at,
        branch_conditions,
        attachments: draft.attachments,
    })
}
