//! Score aggregation and ranking
//!
//! This module computes per-habit scores, weekly rollups, grand totals,
//! completion rates and the leaderboard from a [`Snapshot`].
//!
//! Every operation is a pure function of the snapshot it borrows. Users with
//! no entries, or ids that are not in the snapshot at all, resolve to zero
//! scores rather than errors. Ranking is a full recomputation on each call.

use crate::scoring::habit_score;
use crate::types::{
    Day, HabitEntry, RankingRow, Snapshot, UserScoreCard, Week, PROGRAM_DAYS,
};
use tracing::debug;

/// Read-only scoring view over one snapshot
#[derive(Debug, Clone, Copy)]
pub struct ScoreEngine<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> ScoreEngine<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    /// Per-habit scores for one week, in catalog order
    pub fn week_scores(&self, user_id: &str, week: Week) -> Vec<f64> {
        self.per_habit_scores(user_id, |day| week.contains(day))
    }

    /// Per-habit scores over every recorded day, in catalog order
    pub fn total_scores(&self, user_id: &str) -> Vec<f64> {
        self.per_habit_scores(user_id, |_| true)
    }

    /// Sum of the user's per-habit totals
    pub fn grand_total(&self, user_id: &str) -> f64 {
        self.total_scores(user_id).iter().sum()
    }

    /// Sum of each week's per-habit scores, one value per week
    pub fn week_totals(&self, user_id: &str) -> Vec<f64> {
        Week::all()
            .map(|week| self.week_scores(user_id, week).iter().sum())
            .collect()
    }

    /// Number of the user's entries marked partial or complete
    ///
    /// This counts entries, not distinct habits or days.
    pub fn completed_habit_count(&self, user_id: &str) -> usize {
        self.user_entries(user_id)
            .filter(|entry| entry.value.is_done())
            .count()
    }

    /// Share of the full habit x day grid marked done, as a percentage
    pub fn completion_rate(&self, user_id: &str) -> f64 {
        let grid = self.snapshot.habits.len() as f64 * PROGRAM_DAYS as f64;
        let completed = self.completed_habit_count(user_id);

        if grid == 0.0 || completed == 0 {
            return 0.0;
        }

        (completed as f64 / grid * 100.0).min(100.0)
    }

    /// All users ordered by grand total, highest first
    ///
    /// Ties keep the order users appear in the snapshot.
    pub fn rankings(&self) -> Vec<RankingRow> {
        let mut rows: Vec<RankingRow> = self
            .snapshot
            .users
            .iter()
            .map(|user| RankingRow {
                id: user.id.clone(),
                name: user.name.clone(),
                avatar: user.avatar.clone(),
                total_score: self.grand_total(&user.id),
                completion_rate: self.completion_rate(&user.id),
            })
            .collect();

        // sort_by is stable, so equal totals retain input order
        rows.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));

        debug!(
            users = rows.len(),
            entries = self.snapshot.entries.len(),
            "computed rankings"
        );

        rows
    }

    /// 1-based leaderboard position of a user
    ///
    /// Unknown users get the total user count (the worst rank) instead of
    /// an error.
    pub fn user_rank(&self, user_id: &str) -> usize {
        self.rankings()
            .iter()
            .position(|row| row.id == user_id)
            .map(|idx| idx + 1)
            .unwrap_or(self.snapshot.users.len())
    }

    /// Full breakdown for one user, or `None` if the user is not in the snapshot
    pub fn score_card(&self, user_id: &str) -> Option<UserScoreCard> {
        self.snapshot.users.iter().find(|u| u.id == user_id)?;
        self.score_card_with_rank(user_id, self.user_rank(user_id))
    }

    /// Score cards for every user, in leaderboard order
    pub fn score_cards(&self) -> Vec<UserScoreCard> {
        self.rankings()
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| self.score_card_with_rank(&row.id, idx + 1))
            .collect()
    }

    fn score_card_with_rank(&self, user_id: &str, rank: usize) -> Option<UserScoreCard> {
        let user = self.snapshot.users.iter().find(|u| u.id == user_id)?;

        let weeks: Vec<Vec<f64>> = Week::all()
            .map(|week| self.week_scores(user_id, week))
            .collect();
        let week_totals = weeks.iter().map(|scores| scores.iter().sum()).collect();
        let total_scores = self.total_scores(user_id);
        let grand_total = total_scores.iter().sum();

        Some(UserScoreCard {
            user: user.clone(),
            rank,
            weeks,
            week_totals,
            total_scores,
            grand_total,
            completion_rate: self.completion_rate(user_id),
            completed_count: self.completed_habit_count(user_id),
        })
    }

    fn user_entries<'s>(&'s self, user_id: &'s str) -> impl Iterator<Item = &'a HabitEntry> + 's {
        let snapshot: &'a Snapshot = self.snapshot;
        snapshot
            .entries
            .iter()
            .filter(move |entry| entry.user_id == user_id)
    }

    fn per_habit_scores<F>(&self, user_id: &str, in_range: F) -> Vec<f64>
    where
        F: Fn(Day) -> bool,
    {
        let habits = &self.snapshot.habits;
        let mut scores = vec![0.0; habits.len()];

        for entry in self.user_entries(user_id).filter(|e| in_range(e.day)) {
            // Entries for habits outside the catalog contribute nothing
            if let Some(idx) = habits.iter().position(|h| h.id == entry.habit_id) {
                scores[idx] += habit_score(&habits[idx], entry.value);
            }
        }

        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::types::{EntryValue, User};
    use pretty_assertions::assert_eq;

    fn entry(user_id: &str, habit_id: u32, day: i64, value: EntryValue) -> HabitEntry {
        HabitEntry {
            user_id: user_id.to_string(),
            habit_id,
            day: Day::new(day).unwrap(),
            value,
        }
    }

    fn week(w: i64) -> Week {
        Week::new(w).unwrap()
    }

    fn scenario_snapshot() -> Snapshot {
        Snapshot {
            habits: default_catalog(),
            users: vec![User::new("u", "Una", "u.png")],
            entries: vec![
                entry("u", 1, 0, EntryValue::Complete),
                entry("u", 2, 0, EntryValue::Partial),
                entry("u", 4, 1, EntryValue::Partial),
            ],
        }
    }

    fn league_snapshot() -> Snapshot {
        let mut entries = Vec::new();
        // ana: meetings on days 0, 20, 40 -> 15
        for day in [0, 20, 40] {
            entries.push(entry("ana", 4, day, EntryValue::Complete));
        }
        // ben: product use complete every day of week 0 -> 28
        for day in 0..14 {
            entries.push(entry("ben", 3, day, EntryValue::Complete));
        }
        // cy: one meeting, one partial read -> 5.5
        entries.push(entry("cy", 4, 50, EntryValue::Partial));
        entries.push(entry("cy", 1, 51, EntryValue::Partial));
        // dee: same total as ana, listed after ana
        for day in [1, 2, 3] {
            entries.push(entry("dee", 4, day, EntryValue::Partial));
        }
        // eve has only not-done entries
        entries.push(entry("eve", 5, 10, EntryValue::NotDone));

        Snapshot {
            habits: default_catalog(),
            users: vec![
                User::new("ana", "Ana", "a.png"),
                User::new("eve", "Eve", "e.png"),
                User::new("ben", "Ben", "b.png"),
                User::new("cy", "Cy", "c.png"),
                User::new("dee", "Dee", "d.png"),
            ],
            entries,
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let snapshot = scenario_snapshot();
        let engine = ScoreEngine::new(&snapshot);

        assert_eq!(engine.week_scores("u", week(0)), vec![1.0, 1.0, 0.0, 5.0, 0.0]);
        assert_eq!(engine.week_scores("u", week(1)), vec![0.0; 5]);
        assert_eq!(engine.grand_total("u"), 7.0);
        assert_eq!(engine.completed_habit_count("u"), 3);

        let expected_rate = 3.0 / (5.0 * 56.0) * 100.0;
        assert!((engine.completion_rate("u") - expected_rate).abs() < 1e-12);
        assert!((engine.completion_rate("u") - 1.0714).abs() < 1e-4);
    }

    #[test]
    fn test_weekly_rollups_partition_total() {
        let snapshot = league_snapshot();
        let engine = ScoreEngine::new(&snapshot);

        for user in &snapshot.users {
            let totals = engine.total_scores(&user.id);
            let mut summed = vec![0.0; snapshot.habits.len()];
            for w in Week::all() {
                for (idx, score) in engine.week_scores(&user.id, w).iter().enumerate() {
                    summed[idx] += score;
                }
            }
            assert_eq!(totals, summed, "user {}", user.id);
        }
    }

    #[test]
    fn test_week_boundaries() {
        let snapshot = Snapshot {
            habits: default_catalog(),
            users: vec![User::new("u", "U", "")],
            entries: vec![
                entry("u", 4, 13, EntryValue::Complete),
                entry("u", 4, 14, EntryValue::Complete),
                entry("u", 4, 55, EntryValue::Complete),
            ],
        };
        let engine = ScoreEngine::new(&snapshot);

        assert_eq!(engine.week_totals("u"), vec![5.0, 5.0, 0.0, 5.0]);
    }

    #[test]
    fn test_completion_rate_bounds() {
        let mut entries = Vec::new();
        for habit in 1..=5 {
            for day in 0..56 {
                entries.push(entry("full", habit, day, EntryValue::Complete));
            }
        }
        let snapshot = Snapshot {
            habits: default_catalog(),
            users: vec![User::new("full", "Full", ""), User::new("idle", "Idle", "")],
            entries,
        };
        let engine = ScoreEngine::new(&snapshot);

        assert_eq!(engine.completion_rate("full"), 100.0);
        assert_eq!(engine.completion_rate("idle"), 0.0);
        assert_eq!(engine.grand_total("full"), 616.0);
    }

    #[test]
    fn test_not_done_entries_do_not_count() {
        let snapshot = league_snapshot();
        let engine = ScoreEngine::new(&snapshot);

        assert_eq!(engine.completed_habit_count("eve"), 0);
        assert_eq!(engine.completion_rate("eve"), 0.0);
        assert_eq!(engine.grand_total("eve"), 0.0);
    }

    #[test]
    fn test_empty_catalog_rate_is_zero() {
        let snapshot = Snapshot {
            habits: vec![],
            users: vec![User::new("u", "U", "")],
            entries: vec![entry("u", 1, 0, EntryValue::Complete)],
        };
        let engine = ScoreEngine::new(&snapshot);

        assert_eq!(engine.completion_rate("u"), 0.0);
        assert!(engine.total_scores("u").is_empty());
        assert_eq!(engine.completed_habit_count("u"), 1);
    }

    #[test]
    fn test_rankings_sorted_with_stable_ties() {
        let snapshot = league_snapshot();
        let engine = ScoreEngine::new(&snapshot);

        let ids: Vec<String> = engine.rankings().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["ben", "ana", "dee", "cy", "eve"]);

        let totals: Vec<f64> = engine.rankings().iter().map(|r| r.total_score).collect();
        assert_eq!(totals, vec![28.0, 15.0, 15.0, 5.5, 0.0]);
    }

    #[test]
    fn test_user_rank_matches_rankings_position() {
        let snapshot = league_snapshot();
        let engine = ScoreEngine::new(&snapshot);
        let rankings = engine.rankings();

        for (idx, row) in rankings.iter().enumerate() {
            assert_eq!(engine.user_rank(&row.id), idx + 1);
        }
    }

    #[test]
    fn test_unknown_user_fallback() {
        let snapshot = league_snapshot();
        let engine = ScoreEngine::new(&snapshot);

        assert_eq!(engine.grand_total("nobody"), 0.0);
        assert_eq!(engine.completion_rate("nobody"), 0.0);
        assert_eq!(engine.week_scores("nobody", week(2)), vec![0.0; 5]);
        assert_eq!(engine.user_rank("nobody"), snapshot.users.len());
        assert!(engine.score_card("nobody").is_none());
    }

    #[test]
    fn test_aggregations_are_idempotent() {
        let snapshot = league_snapshot();
        let engine = ScoreEngine::new(&snapshot);

        assert_eq!(engine.rankings(), engine.rankings());
        assert_eq!(
            engine.total_scores("cy").iter().map(|s| s.to_bits()).collect::<Vec<_>>(),
            engine.total_scores("cy").iter().map(|s| s.to_bits()).collect::<Vec<_>>()
        );
        assert_eq!(
            engine.completion_rate("ben").to_bits(),
            engine.completion_rate("ben").to_bits()
        );
    }

    #[test]
    fn test_score_card() {
        let snapshot = league_snapshot();
        let engine = ScoreEngine::new(&snapshot);

        let card = engine.score_card("cy").unwrap();
        assert_eq!(card.rank, 4);
        assert_eq!(card.weeks.len(), 4);
        assert_eq!(card.weeks[3], vec![0.5, 0.0, 0.0, 5.0, 0.0]);
        assert_eq!(card.week_totals, vec![0.0, 0.0, 0.0, 5.5]);
        assert_eq!(card.grand_total, 5.5);
        assert_eq!(card.completed_count, 2);
    }

    #[test]
    fn test_score_cards_follow_leaderboard() {
        let snapshot = league_snapshot();
        let engine = ScoreEngine::new(&snapshot);

        let cards = engine.score_cards();
        let ids: Vec<&str> = cards.iter().map(|c| c.user.id.as_str()).collect();
        assert_eq!(ids, vec!["ben", "ana", "dee", "cy", "eve"]);

        for (idx, card) in cards.iter().enumerate() {
            assert_eq!(card.rank, idx + 1);
            assert_eq!(Some(card), engine.score_card(&card.user.id).as_ref());
        }
    }

    #[test]
    fn test_entries_outside_catalog_are_ignored_for_scores() {
        let snapshot = Snapshot {
            habits: default_catalog(),
            users: vec![User::new("u", "U", "")],
            entries: vec![entry("u", 42, 0, EntryValue::Complete)],
        };
        let engine = ScoreEngine::new(&snapshot);

        assert_eq!(engine.grand_total("u"), 0.0);
    }
}
