//! Per-entry scoring
//!
//! Maps a habit's scoring rule and an entry value to the points that entry
//! earns:
//! - binary: any non-zero entry earns the full value
//! - partial / high_value: half value for partial, full value for complete

use crate::types::{EntryValue, Habit, ScoreType};

/// Score earned by one entry under the given rule and maximum value
pub fn entry_score(score_type: ScoreType, score_value: u32, value: EntryValue) -> f64 {
    let max = score_value as f64;

    match (score_type, value) {
        (_, EntryValue::NotDone) => 0.0,
        (ScoreType::Binary, _) => max,
        (ScoreType::Partial, EntryValue::Partial) => max / 2.0,
        (ScoreType::Partial, EntryValue::Complete) => max,
        (ScoreType::HighValue, EntryValue::Partial) => max / 2.0,
        (ScoreType::HighValue, EntryValue::Complete) => max,
    }
}

/// Score earned by one entry for a catalog habit
pub fn habit_score(habit: &Habit, value: EntryValue) -> f64 {
    entry_score(habit.score_type, habit.score_value, value)
}
