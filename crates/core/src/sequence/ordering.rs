//! Step ordering validation.

use crate::error::CoreError;

use super::step::CampaignSequenceStep;

/// Error message for any gap, duplicate or out-of-place step order.
pub const ORDERING_ERROR: &str = "steps must be sequentially ordered starting from 1";

/// Validate that step orders are exactly `1..=N` in list order.
///
/// The list is checked as submitted and never sorted: a list holding the
/// right values in the wrong positions is rejected.
pub fn validate_ordering(steps: &[CampaignSequenceStep]) -> Result<(), CoreError> {
    if steps.is_empty() {
        return Err(CoreError::Validation(
            "sequence must contain at least one step".to_string(),
        ));
    }

    let in_sequence = steps
        .iter()
        .enumerate()
        .all(|(index, step)| u64::from(step.order) == index as u64 + 1);

    if in_sequence {
        Ok(())
    } else {
        Err(CoreError::Validation(ORDERING_ERROR.to_string()))
    }
}
