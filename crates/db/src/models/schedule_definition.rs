//! Schedule definition model.

use chrono::{NaiveDate, NaiveTime, Weekday};
use outreach_core::error::CoreError;
use outreach_core::sequence::ScheduleDefinition;
use outreach_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `schedule_definitions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduleDefinitionRow {
    pub id: DbId,
    pub name: String,
    pub utc_offset_minutes: i32,
    pub business_start: NaiveTime,
    pub business_end: NaiveTime,
    /// ISO weekday numbers, Monday = 1.
    pub business_days: Vec<i16>,
    pub holidays: Vec<NaiveDate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ScheduleDefinitionRow {
    /// Convert into the engine's calendar type.
    pub fn to_definition(&self) -> Result<ScheduleDefinition, CoreError> {
        let business_days = self
            .business_days
            .iter()
            .map(|&day| {
                iso_weekday(day).ok_or_else(|| {
                    CoreError::Internal(format!(
                        "schedule definition {} has invalid weekday {day}",
                        self.id
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScheduleDefinition {
            utc_offset_minutes: self.utc_offset_minutes,
            business_start: self.business_start,
            business_end: self.business_end,
            business_days,
            holidays: self.holidays.clone(),
        })
    }
}

fn iso_weekday(day: i16) -> Option<Weekday> {
    match day {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}
