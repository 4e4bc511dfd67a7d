//! Business-hours post-processing of computed dispatch instants.
//!
//! A schedule definition supplies the sending timezone, the daily sending
//! window, the weekdays that count as business days and a holiday list.
//! [`ScheduleDefinition::adjust`] moves a candidate instant forward to the
//! next moment inside the window. It is a pure function of its input and
//! never edits a [`ScheduledDispatch`] in place.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

use super::schedule::ScheduledDispatch;

/// How far ahead [`ScheduleDefinition::adjust`] searches for a business day.
pub const MAX_LOOKAHEAD_DAYS: u32 = 366;

/// Largest accepted UTC offset, in minutes (UTC+14:00).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Sending calendar attached to a sequence template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    pub utc_offset_minutes: i32,
    pub business_start: NaiveTime,
    pub business_end: NaiveTime,
    pub business_days: Vec<Weekday>,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

/// A dispatch after business-hours adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdjustedDispatch {
    pub step_order: u32,
    /// Instant produced by the calculator.
    pub candidate_at: DateTime<Utc>,
    /// Instant after moving into the business window.
    pub dispatch_at: DateTime<Utc>,
}

impl Default for ScheduleDefinition {
    /// UTC, 09:00–17:00, Monday to Friday, no holidays.
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            business_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            business_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            business_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            holidays: Vec::new(),
        }
    }
}

impl ScheduleDefinition {
    /// Check the definition is usable before adjusting anything with it.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(CoreError::Validation(format!(
                "utc_offset_minutes {} is outside +/-{MAX_UTC_OFFSET_MINUTES}",
                self.utc_offset_minutes
            )));
        }
        if self.business_start >= self.business_end {
            return Err(CoreError::Validation(
                "business_start must be earlier than business_end".to_string(),
            ));
        }
        if self.business_days.is_empty() {
            return Err(CoreError::Validation(
                "schedule definition must include at least one business day".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<FixedOffset, CoreError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            CoreError::Validation(format!(
                "utc_offset_minutes {} is not a valid offset",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        self.business_days.contains(&date.weekday()) && !self.holidays.contains(&date)
    }

    /// Move `candidate` to the earliest instant at or after it that falls on
    /// a business day inside `[business_start, business_end)`.
    pub fn adjust(&self, candidate: DateTime<Utc>) -> Result<DateTime<Utc>, CoreError> {
        self.validate()?;
        let tz = self.timezone()?;

        let local = candidate.with_timezone(&tz).naive_local();
        let mut date = local.date();
        let mut time = local.time();

        for _ in 0..=MAX_LOOKAHEAD_DAYS {
            if self.is_business_day(date) {
                if time < self.business_start {
                    return to_utc(&tz, date, self.business_start);
                }
                if time < self.business_end {
                    return to_utc(&tz, date, time);
                }
            }
            date = date.succ_opt().ok_or_else(|| {
                CoreError::Validation("dispatch date is out of range".to_string())
            })?;
            time = self.business_start;
        }

        Err(CoreError::Validation(format!(
            "no business day found within {MAX_LOOKAHEAD_DAYS} days"
        )))
    }

    /// Adjust every entry of a computed plan.
    pub fn apply(&self, plan: &[ScheduledDispatch]) -> Result<Vec<AdjustedDispatch>, CoreError> {
        plan.iter()
            .map(|dispatch| {
                Ok(AdjustedDispatch {
                    step_order: dispatch.step_order,
                    candidate_at: dispatch.dispatch_at,
                    dispatch_at: self.adjust(dispatch.dispatch_at)?,
                })
            })
            .collect()
    }
}

fn to_utc(tz: &FixedOffset, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>, CoreError> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CoreError::Internal(format!("unrepresentable local time {date} {time}")))
}
