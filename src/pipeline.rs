//! Tracker orchestration
//!
//! This module provides the public API for habit-tally. The free functions
//! score a JSON snapshot in one shot; [`HabitTracker`] keeps state in a
//! [`HabitStore`] and answers queries against it.

use tracing::{info, warn};

use crate::calendar::ProgramCalendar;
use crate::catalog::find_habit;
use crate::encoder::{ScoreboardEncoder, ScoreboardPayload};
use crate::engine::ScoreEngine;
use crate::error::ComputeError;
use crate::schema::EntryRecord;
use crate::store::{HabitStore, MemoryStore};
use crate::types::{EntryValue, RankingRow, Snapshot, User, UserScoreCard};

/// Compute the leaderboard for a JSON snapshot.
///
/// # Arguments
/// * `snapshot_json` - `{"habits"?: [...], "users": [...], "entries": [...]}`
///
/// # Returns
/// JSON array of ranking rows, highest total first
///
/// # Example
/// ```ignore
/// let rankings = rankings_from_json(snapshot_json)?;
/// ```
pub fn rankings_from_json(snapshot_json: &str) -> Result<String, ComputeError> {
    let snapshot = Snapshot::from_json(snapshot_json)?;
    let rankings = ScoreEngine::new(&snapshot).rankings();
    serde_json::to_string(&rankings).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

/// Compute the full scoreboard for a JSON snapshot.
///
/// # Returns
/// Pretty-printed scoreboard payload JSON
pub fn scoreboard_from_json(snapshot_json: &str) -> Result<String, ComputeError> {
    let snapshot = Snapshot::from_json(snapshot_json)?;
    ScoreboardEncoder::new().encode_to_json(&snapshot)
}

/// Stateful tracker that records entries and scores them.
///
/// Each query takes one snapshot of the store, so all numbers returned by a
/// single call agree with each other. Two calls may see different data if
/// entries were recorded in between.
pub struct HabitTracker<S: HabitStore = MemoryStore> {
    store: S,
    calendar: Option<ProgramCalendar>,
    encoder: ScoreboardEncoder,
}

impl Default for HabitTracker<MemoryStore> {
    fn default() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl<S: HabitStore> HabitTracker<S> {
    /// Create a tracker over a store
    pub fn new(store: S) -> Self {
        Self {
            store,
            calendar: None,
            encoder: ScoreboardEncoder::new(),
        }
    }

    /// Resolve date-based records against this program calendar
    pub fn with_calendar(mut self, calendar: ProgramCalendar) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn calendar(&self) -> Option<&ProgramCalendar> {
        self.calendar.as_ref()
    }

    /// Register or update a user
    pub fn add_user(&mut self, user: User) {
        info!(user_id = %user.id, "registered user");
        self.store.upsert_user(user);
    }

    /// Validate and store one entry, returning the value it replaced
    pub fn record(&mut self, record: &EntryRecord) -> Result<Option<EntryValue>, ComputeError> {
        let entry = record.to_entry(self.calendar.as_ref()).map_err(|e| {
            warn!(user_id = %record.user_id, habit_id = record.habit_id, error = %e, "rejected entry");
            ComputeError::from(e)
        })?;

        let habits = self.store.habits();
        if find_habit(&habits, entry.habit_id).is_none() {
            warn!(habit_id = entry.habit_id, "rejected entry for unknown habit");
            return Err(ComputeError::UnknownHabit(entry.habit_id));
        }

        if !self.store.users().iter().any(|u| u.id == entry.user_id) {
            warn!(user_id = %entry.user_id, "rejected entry for unknown user");
            return Err(ComputeError::UnknownUser(entry.user_id));
        }

        info!(
            user_id = %entry.user_id,
            habit_id = entry.habit_id,
            day = entry.day.index(),
            value = entry.value.as_u8(),
            "recording entry"
        );
        Ok(self.store.upsert_entry(entry))
    }

    /// Record a batch of entries, stopping at the first failure
    ///
    /// Entries before the failing one stay recorded.
    pub fn record_batch(&mut self, records: &[EntryRecord]) -> Result<usize, ComputeError> {
        for record in records {
            self.record(record)?;
        }
        Ok(records.len())
    }

    /// Current state of the store
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn rankings(&self) -> Vec<RankingRow> {
        let snapshot = self.snapshot();
        ScoreEngine::new(&snapshot).rankings()
    }

    pub fn user_rank(&self, user_id: &str) -> usize {
        let snapshot = self.snapshot();
        ScoreEngine::new(&snapshot).user_rank(user_id)
    }

    pub fn score_card(&self, user_id: &str) -> Option<UserScoreCard> {
        let snapshot = self.snapshot();
        ScoreEngine::new(&snapshot).score_card(user_id)
    }

    pub fn scoreboard(&self) -> ScoreboardPayload {
        let snapshot = self.snapshot();
        self.encoder.encode(&snapshot)
    }

    pub fn scoreboard_json(&self) -> Result<String, ComputeError> {
        let snapshot = self.snapshot();
        self.encoder.encode_to_json(&snapshot)
    }
}

impl HabitTracker<MemoryStore> {
    /// Load store state from JSON
    pub fn load(&mut self, json: &str) -> Result<(), ComputeError> {
        self.store =
            MemoryStore::from_json(json).map_err(|e| ComputeError::ParseError(e.to_string()))?;
        info!(
            users = self.store.users().len(),
            entries = self.store.entry_count(),
            "loaded store"
        );
        Ok(())
    }

    /// Save store state to JSON
    pub fn save(&self) -> Result<String, ComputeError> {
        self.store
            .to_json()
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use chrono::NaiveDate;

    fn sample_snapshot_json() -> &'static str {
        r#"{
            "users": [
                {"id": "u1", "name": "Ada", "avatar": "ada.png"},
                {"id": "u2", "name": "Bea", "avatar": "bea.png"}
            ],
            "entries": [
                {"user_id": "u1", "habit_id": 1, "day": 0, "value": 2},
                {"user_id": "u1", "habit_id": 2, "day": 0, "value": 1},
                {"user_id": "u1", "habit_id": 4, "day": 1, "value": 1},
                {"user_id": "u2", "habit_id": 4, "day": 2, "value": 2},
                {"user_id": "u2", "habit_id": 4, "day": 30, "value": 2}
            ]
        }"#
    }

    fn tracker_with_users() -> HabitTracker {
        let mut tracker: HabitTracker = HabitTracker::default();
        tracker.add_user(User::new("u1", "Ada", "ada.png"));
        tracker.add_user(User::new("u2", "Bea", "bea.png"));
        tracker
    }

    #[test]
    fn test_rankings_from_json() {
        let json = rankings_from_json(sample_snapshot_json()).unwrap();
        let rows: Vec<RankingRow> = serde_json::from_str(&json).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "u2");
        assert_eq!(rows[0].total_score, 10.0);
        assert_eq!(rows[1].id, "u1");
        assert_eq!(rows[1].total_score, 7.0);
    }

    #[test]
    fn test_scoreboard_from_json() {
        let json = scoreboard_from_json(sample_snapshot_json()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["program"]["days"], 56);
        assert_eq!(payload["cards"][1]["user"]["id"], "u1");
        assert_eq!(payload["cards"][1]["grand_total"], 7.0);
    }

    #[test]
    fn test_rankings_from_json_last_write_wins() {
        let json = r#"{
            "users": [
                {"id": "u", "name": "You"},
                {"id": "u", "name": "You again"}
            ],
            "entries": [
                {"user_id": "u", "habit_id": 4, "day": 0, "value": 2},
                {"user_id": "u", "habit_id": 4, "day": 0, "value": 0}
            ]
        }"#;

        let rows: Vec<RankingRow> = serde_json::from_str(&rankings_from_json(json).unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "You again");
        assert_eq!(rows[0].total_score, 0.0);
        assert_eq!(rows[0].completion_rate, 0.0);

        let payload: serde_json::Value =
            serde_json::from_str(&scoreboard_from_json(json).unwrap()).unwrap();
        assert_eq!(payload["cards"].as_array().map(|c| c.len()), Some(1));
        assert_eq!(payload["cards"][0]["completed_count"], 0);
    }

    #[test]
    fn test_scoreboard_from_json_large_score_value() {
        let json = r#"{
            "habits": [{"id": 1, "label": "Big", "score_type": "binary", "score_value": 100000000}],
            "users": [{"id": "u", "name": "You"}],
            "entries": [{"user_id": "u", "habit_id": 1, "day": 0, "value": 1}]
        }"#;

        let payload: serde_json::Value =
            serde_json::from_str(&scoreboard_from_json(json).unwrap()).unwrap();
        assert_eq!(payload["program"]["max_score"], 5_600_000_000.0);
        assert_eq!(payload["rankings"][0]["total_score"], 100_000_000.0);
    }

    #[test]
    fn test_invalid_json() {
        assert!(rankings_from_json("not valid json").is_err());
        // value outside 0..=2 is rejected while parsing the snapshot
        let bad = r#"{"users": [], "entries": [{"user_id": "u", "habit_id": 1, "day": 0, "value": 5}]}"#;
        assert!(rankings_from_json(bad).is_err());
    }

    #[test]
    fn test_record_and_rank() {
        let mut tracker = tracker_with_users();

        tracker.record(&EntryRecord::new("u1", 4, 0, 2)).unwrap();
        tracker.record(&EntryRecord::new("u2", 3, 0, 1)).unwrap();

        assert_eq!(tracker.user_rank("u1"), 1);
        assert_eq!(tracker.user_rank("u2"), 2);
        assert_eq!(tracker.user_rank("ghost"), 2);

        let card = tracker.score_card("u2").unwrap();
        assert_eq!(card.grand_total, 1.0);
    }

    #[test]
    fn test_record_overwrites_previous_value() {
        let mut tracker = tracker_with_users();

        assert_eq!(tracker.record(&EntryRecord::new("u1", 1, 5, 1)).unwrap(), None);
        assert_eq!(
            tracker.record(&EntryRecord::new("u1", 1, 5, 2)).unwrap(),
            Some(EntryValue::Partial)
        );
        assert_eq!(tracker.score_card("u1").unwrap().grand_total, 1.0);
    }

    #[test]
    fn test_record_rejections() {
        let mut tracker = tracker_with_users();

        assert!(matches!(
            tracker.record(&EntryRecord::new("u1", 1, 0, 3)),
            Err(ComputeError::InvalidEntry(ValidationError::InvalidValue(3)))
        ));
        assert!(matches!(
            tracker.record(&EntryRecord::new("u1", 9, 0, 1)),
            Err(ComputeError::UnknownHabit(9))
        ));
        assert!(matches!(
            tracker.record(&EntryRecord::new("nobody", 1, 0, 1)),
            Err(ComputeError::UnknownUser(_))
        ));
        assert!(tracker.snapshot().entries.is_empty());
    }

    #[test]
    fn test_record_by_date_with_calendar() {
        let calendar = ProgramCalendar::parse("2024-01-01").unwrap();
        let mut tracker = tracker_with_users().with_calendar(calendar);

        let date = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        tracker.record(&EntryRecord::on_date("u1", 4, date, 2)).unwrap();

        let card = tracker.score_card("u1").unwrap();
        assert_eq!(card.week_totals, vec![0.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_record_batch_stops_at_failure() {
        let mut tracker = tracker_with_users();
        let records = vec![
            EntryRecord::new("u1", 1, 0, 2),
            EntryRecord::new("u1", 1, 99, 2),
            EntryRecord::new("u1", 2, 0, 2),
        ];

        assert!(tracker.record_batch(&records).is_err());
        assert_eq!(tracker.snapshot().entries.len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let mut tracker = tracker_with_users();
        tracker.record(&EntryRecord::new("u2", 4, 10, 1)).unwrap();

        let saved = tracker.save().unwrap();

        let mut restored: HabitTracker = HabitTracker::default();
        restored.load(&saved).unwrap();

        assert_eq!(restored.rankings(), tracker.rankings());
        assert_eq!(restored.snapshot(), tracker.snapshot());
    }

    #[test]
    fn test_scoreboard_matches_rankings() {
        let mut tracker = tracker_with_users();
        tracker.record(&EntryRecord::new("u2", 5, 0, 2)).unwrap();

        let scoreboard = tracker.scoreboard();
        assert_eq!(scoreboard.rankings, tracker.rankings());
        assert_eq!(scoreboard.cards[0].user.id, "u2");
        assert!(tracker.scoreboard_json().is_ok());
    }
}
