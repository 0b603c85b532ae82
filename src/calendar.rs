//! Program calendar
//!
//! Maps calendar dates onto program day indices. Day 0 is the program
//! start date; the program runs for [`PROGRAM_DAYS`] consecutive days.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Day, Week, PROGRAM_DAYS};

/// Calendar anchored on the program start date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramCalendar {
    pub start_date: NaiveDate,
}

impl ProgramCalendar {
    pub fn new(start_date: NaiveDate) -> Self {
        Self { start_date }
    }

    /// Parse a `YYYY-MM-DD` start date
    pub fn parse(start_date: &str) -> Result<Self, chrono::ParseError> {
        NaiveDate::parse_from_str(start_date, "%Y-%m-%d").map(Self::new)
    }

    /// Program day for a date, or `None` before the start or after the end
    pub fn day_index(&self, date: NaiveDate) -> Option<Day> {
        let offset = (date - self.start_date).num_days();
        Day::new(offset).ok()
    }

    /// Program day for a UTC instant
    pub fn today_index(&self, now: DateTime<Utc>) -> Option<Day> {
        self.day_index(now.date_naive())
    }

    pub fn week_of(&self, day: Day) -> Week {
        day.week()
    }

    /// Calendar date of a program day
    pub fn date_of(&self, day: Day) -> NaiveDate {
        self.start_date + Duration::days(day.index() as i64)
    }

    /// Last calendar date of the program
    pub fn end_date(&self) -> NaiveDate {
        self.start_date + Duration::days(PROGRAM_DAYS as i64 - 1)
    }
}
