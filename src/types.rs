//! Core types for habit-tally
//!
//! This module defines the data structures the scoring engine reads
//! (habits, entries, users), the snapshot that bundles them, and the
//! result rows it produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidationError;

/// Length of the program in days
pub const PROGRAM_DAYS: u32 = 56;

/// Width of one aggregation week in days
pub const DAYS_PER_WEEK: u32 = 14;

/// Number of aggregation weeks in the program
pub const WEEK_COUNT: u32 = PROGRAM_DAYS / DAYS_PER_WEEK;

/// Scoring rule attached to a habit
///
/// `Partial` and `HighValue` share the same arithmetic today but are kept
/// as separate variants so either can change without a data migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    /// Any non-zero entry earns the full value
    Binary,
    /// Half value for a partial entry, full value for a complete one
    Partial,
    /// Same split as `Partial`
    HighValue,
}

impl ScoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreType::Binary => "binary",
            ScoreType::Partial => "partial",
            ScoreType::HighValue => "high_value",
        }
    }
}

/// A tracked habit from the program catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: u32,
    pub label: String,
    pub score_type: ScoreType,
    /// Maximum score a single completed entry can earn
    pub score_value: u32,
}

impl Habit {
    pub fn new(id: u32, label: impl Into<String>, score_type: ScoreType, score_value: u32) -> Self {
        Self {
            id,
            label: label.into(),
            score_type,
            score_value,
        }
    }
}

/// Recorded completion level for one habit on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryValue {
    NotDone,
    Partial,
    Complete,
}

impl EntryValue {
    pub fn as_u8(&self) -> u8 {
        match self {
            EntryValue::NotDone => 0,
            EntryValue::Partial => 1,
            EntryValue::Complete => 2,
        }
    }

    /// True for partial and complete entries
    pub fn is_done(&self) -> bool {
        !matches!(self, EntryValue::NotDone)
    }
}

impl TryFrom<i64> for EntryValue {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EntryValue::NotDone),
            1 => Ok(EntryValue::Partial),
            2 => Ok(EntryValue::Complete),
            other => Err(ValidationError::InvalidValue(other)),
        }
    }
}

impl Serialize for EntryValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for EntryValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        EntryValue::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Validated program day index in `0..PROGRAM_DAYS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Day(u32);

impl Day {
    pub fn new(day: i64) -> Result<Self, ValidationError> {
        if (0..PROGRAM_DAYS as i64).contains(&day) {
            Ok(Day(day as u32))
        } else {
            Err(ValidationError::DayOutOfRange(day))
        }
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    /// Week this day falls into
    pub fn week(&self) -> Week {
        Week(self.0 / DAYS_PER_WEEK)
    }
}

impl<'de> Deserialize<'de> for Day {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Day::new(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated aggregation week index in `0..WEEK_COUNT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Week(u32);

impl Week {
    pub fn new(week: i64) -> Result<Self, ValidationError> {
        if (0..WEEK_COUNT as i64).contains(&week) {
            Ok(Week(week as u32))
        } else {
            Err(ValidationError::WeekOutOfRange(week))
        }
    }

    /// All program weeks in order
    pub fn all() -> impl Iterator<Item = Week> {
        (0..WEEK_COUNT).map(Week)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    /// Inclusive day range `[14w, 14w + 13]`
    pub fn days(&self) -> std::ops::RangeInclusive<u32> {
        let first = self.0 * DAYS_PER_WEEK;
        first..=first + DAYS_PER_WEEK - 1
    }

    pub fn contains(&self, day: Day) -> bool {
        self.days().contains(&day.index())
    }
}

/// One user's recorded value for a habit on a program day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitEntry {
    pub user_id: String,
    pub habit_id: u32,
    pub day: Day,
    pub value: EntryValue,
}

impl HabitEntry {
    /// Composite key; at most one entry exists per key
    pub fn key(&self) -> EntryKey {
        EntryKey {
            user_id: self.user_id.clone(),
            habit_id: self.habit_id,
            day: self.day,
        }
    }
}

/// `(user_id, habit_id, day)` key of an entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey {
    pub user_id: String,
    pub habit_id: u32,
    pub day: Day,
}

/// Program participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: avatar.into(),
        }
    }
}

/// Immutable input for one scoring call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Habit catalog in display order; defaults to the program catalog
    #[serde(default = "crate::catalog::default_catalog")]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub entries: Vec<HabitEntry>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            habits: crate::catalog::default_catalog(),
            users: Vec::new(),
            entries: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Parse a snapshot and collapse duplicate users and entries
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::normalized)
    }

    /// Keep one user per id and one entry per `(user_id, habit_id, day)`.
    ///
    /// A later duplicate replaces the earlier one; users keep the position
    /// of their first appearance. Entries come out in key order.
    pub fn normalized(self) -> Self {
        let mut users: Vec<User> = Vec::with_capacity(self.users.len());
        for user in self.users {
            match users.iter_mut().find(|u| u.id == user.id) {
                Some(existing) => *existing = user,
                None => users.push(user),
            }
        }

        let entries: BTreeMap<EntryKey, EntryValue> = self
            .entries
            .into_iter()
            .map(|entry| (entry.key(), entry.value))
            .collect();

        Self {
            habits: self.habits,
            users,
            entries: entries
                .into_iter()
                .map(|(key, value)| HabitEntry {
                    user_id: key.user_id,
                    habit_id: key.habit_id,
                    day: key.day,
                    value,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub total_score: f64,
    /// Percentage of the habit x day grid marked done (0-100)
    pub completion_rate: f64,
}

/// Everything the presentation layer shows for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserScoreCard {
    pub user: User,
    /// 1-based leaderboard position
    pub rank: usize,
    /// Per-habit scores for each week, catalog order
    pub weeks: Vec<Vec<f64>>,
    /// Sum of each week's per-habit scores
    pub week_totals: Vec<f64>,
    /// Per-habit scores over the whole program
    pub total_scores: Vec<f64>,
    pub grand_total: f64,
    pub completion_rate: f64,
    pub completed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_value_domain() {
        assert_eq!(EntryValue::try_from(0).unwrap(), EntryValue::NotDone);
        assert_eq!(EntryValue::try_from(2).unwrap(), EntryValue::Complete);
        assert!(matches!(
            EntryValue::try_from(3),
            Err(ValidationError::InvalidValue(3))
        ));
        assert!(EntryValue::try_from(-1).is_err());
    }

    #[test]
    fn test_day_bounds() {
        assert!(Day::new(0).is_ok());
        assert!(Day::new(55).is_ok());
        assert!(matches!(Day::new(56), Err(ValidationError::DayOutOfRange(56))));
        assert!(Day::new(-1).is_err());
    }

    #[test]
    fn test_week_day_ranges() {
        let week = Week::new(1).unwrap();
        assert_eq!(week.days(), 14..=27);
        assert!(week.contains(Day::new(14).unwrap()));
        assert!(week.contains(Day::new(27).unwrap()));
        assert!(!week.contains(Day::new(28).unwrap()));
        assert_eq!(Day::new(55).unwrap().week(), Week::new(3).unwrap());
        assert!(Week::new(4).is_err());
        assert_eq!(Week::all().count(), 4);
    }

    #[test]
    fn test_entry_deserialize_rejects_bad_value() {
        let ok = r#"{"user_id":"u1","habit_id":1,"day":3,"value":2}"#;
        let entry: HabitEntry = serde_json::from_str(ok).unwrap();
        assert_eq!(entry.value, EntryValue::Complete);
        assert_eq!(entry.day.index(), 3);

        let bad_value = r#"{"user_id":"u1","habit_id":1,"day":3,"value":7}"#;
        assert!(serde_json::from_str::<HabitEntry>(bad_value).is_err());

        let bad_day = r#"{"user_id":"u1","habit_id":1,"day":56,"value":1}"#;
        assert!(serde_json::from_str::<HabitEntry>(bad_day).is_err());
    }

    #[test]
    fn test_snapshot_defaults_to_catalog() {
        let snapshot = Snapshot::from_json(r#"{"users": []}"#).unwrap();
        assert_eq!(snapshot.habits.len(), 5);
        assert!(snapshot.entries.is_empty());
    }

    #[test]
    fn test_snapshot_from_json_collapses_duplicates() {
        let json = r#"{
            "users": [
                {"id": "u", "name": "Old"},
                {"id": "v", "name": "Vee"},
                {"id": "u", "name": "New"}
            ],
            "entries": [
                {"user_id": "u", "habit_id": 4, "day": 0, "value": 2},
                {"user_id": "u", "habit_id": 1, "day": 3, "value": 1},
                {"user_id": "u", "habit_id": 4, "day": 0, "value": 0}
            ]
        }"#;
        let snapshot = Snapshot::from_json(json).unwrap();

        let names: Vec<&str> = snapshot.users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["New", "Vee"]);

        assert_eq!(snapshot.entries.len(), 2);
        let cell = snapshot
            .entries
            .iter()
            .find(|e| e.habit_id == 4)
            .unwrap();
        assert_eq!(cell.value, EntryValue::NotDone);
    }

    #[test]
    fn test_score_type_wire_names() {
        let json = serde_json::to_string(&ScoreType::HighValue).unwrap();
        assert_eq!(json, "\"high_value\"");
        assert_eq!(ScoreType::Binary.as_str(), "binary");
    }
}
