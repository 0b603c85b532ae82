//! habit.entry.v1 record definition
//!
//! Incoming entries carry raw integers so that out-of-range values can be
//! reported precisely instead of failing deep inside deserialization. A
//! record names its program day either directly (`day`) or through a
//! calendar `date` resolved against the program start.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::ProgramCalendar;
use crate::error::ValidationError;
use crate::types::{Day, EntryValue, HabitEntry};

/// Current entry schema version
pub const SCHEMA_VERSION: &str = "habit.entry.v1";

/// Entry submission as received from a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Schema version identifier; checked when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Unique submission identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    #[serde(default)]
    pub user_id: String,
    pub habit_id: i64,
    /// Program day index (0-55)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i64>,
    /// Calendar date, used when `day` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// 0 = not done, 1 = partial, 2 = complete
    pub value: i64,
    /// When the client recorded the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl EntryRecord {
    /// Create a record for a program day
    pub fn new(user_id: impl Into<String>, habit_id: i64, day: i64, value: i64) -> Self {
        EntryRecord {
            schema_version: Some(SCHEMA_VERSION.to_string()),
            entry_id: Some(uuid::Uuid::new_v4().to_string()),
            user_id: user_id.into(),
            habit_id,
            day: Some(day),
            date: None,
            value,
            recorded_at: Some(Utc::now()),
        }
    }

    /// Create a record for a calendar date
    pub fn on_date(user_id: impl Into<String>, habit_id: i64, date: NaiveDate, value: i64) -> Self {
        EntryRecord {
            day: None,
            date: Some(date),
            ..EntryRecord::new(user_id, habit_id, 0, value)
        }
    }

    /// Validate every field that does not need a calendar
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(version) = &self.schema_version {
            if version != SCHEMA_VERSION {
                return Err(ValidationError::InvalidSchemaVersion {
                    expected: SCHEMA_VERSION.to_string(),
                    actual: version.clone(),
                });
            }
        }

        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingUser);
        }

        if self.habit_id <= 0 || self.habit_id > u32::MAX as i64 {
            return Err(ValidationError::InvalidHabitId(self.habit_id));
        }

        EntryValue::try_from(self.value)?;

        match (self.day, self.date) {
            (Some(day), _) => Day::new(day).map(|_| ()),
            (None, Some(_)) => Ok(()),
            (None, None) => Err(ValidationError::MissingDay),
        }
    }

    /// Resolve into a typed entry
    ///
    /// `calendar` is only consulted for records that carry a date instead
    /// of a day index.
    pub fn to_entry(
        &self,
        calendar: Option<&ProgramCalendar>,
    ) -> Result<HabitEntry, ValidationError> {
        self.validate()?;

        let day = match (self.day, self.date) {
            (Some(day), _) => Day::new(day)?,
            (None, Some(date)) => {
                let calendar = calendar.ok_or(ValidationError::NoCalendar)?;
                calendar
                    .day_index(date)
                    .ok_or_else(|| ValidationError::DateOutsideProgram(date.to_string()))?
            }
            (None, None) => return Err(ValidationError::MissingDay),
        };

        Ok(HabitEntry {
            user_id: self.user_id.clone(),
            habit_id: self.habit_id as u32,
            day,
            value: EntryValue::try_from(self.value)?,
        })
    }
}

impl TryFrom<EntryRecord> for HabitEntry {
    type Error = ValidationError;

    fn try_from(record: EntryRecord) -> Result<Self, Self::Error> {
        record.to_entry(None)
    }
}
