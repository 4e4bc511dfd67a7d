//! Dispatch schedule calculation.
//!
//! Turns each step's relative `delay_days` and fixed `send_at` into an
//! absolute instant. Delays accumulate: a step's date is the start date plus
//! the sum of every delay up to and including its own. Business hours and
//! holidays are not considered here; see [`super::calendar`].

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::error::CoreError;

use super::step::{CampaignSequenceStep, SendAt};

/// Candidate dispatch time for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledDispatch {
    pub step_order: u32,
    /// Cumulative days from the start date.
    pub day_offset: u64,
    /// Local calendar date in the schedule timezone.
    pub local_date: NaiveDate,
    pub send_at: SendAt,
    pub dispatch_at: DateTime<Utc>,
}

/// Compute the candidate dispatch instant of every step.
///
/// `start_date` is the campaign launch date as seen in `tz`. Local times
/// that occur twice (DST fall-back) resolve to the earlier instant; local
/// times that do not exist (DST spring-forward) are rejected.
pub fn compute_schedule<Tz: TimeZone>(
    steps: &[CampaignSequenceStep],
    start_date: NaiveDate,
    tz: &Tz,
) -> Result<Vec<ScheduledDispatch>, CoreError> {
    let mut offset: u64 = 0;
    let mut plan = Vec::with_capacity(steps.len());

    for step in steps {
        offset += u64::from(step.delay_days);

        let local_date = start_date.checked_add_days(Days::new(offset)).ok_or_else(|| {
            CoreError::Validation(format!(
                "step {} falls outside the supported date range",
                step.order
            ))
        })?;

        let local = local_date.and_time(step.send_at.time());
        let dispatch_at = tz
            .from_local_datetime(&local)
            .earliest()
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "step {} send_at {} does not exist on {local_date} in the schedule timezone",
                    step.order, step.send_at
                ))
            })?
            .with_timezone(&Utc);

        plan.push(ScheduledDispatch {
            step_order: step.order,
            day_offset: offset,
            local_date,
            send_at: step.send_at,
            dispatch_at,
        });
    }

    Ok(plan)
}
