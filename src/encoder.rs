//! Scoreboard encoding
//!
//! This module turns engine results into a versioned JSON document for the
//! presentation layer: producer metadata, program shape, the leaderboard and
//! one score card per user.

use crate::catalog::max_program_score;
use crate::engine::ScoreEngine;
use crate::error::ComputeError;
use crate::types::{
    Habit, RankingRow, Snapshot, UserScoreCard, DAYS_PER_WEEK, PROGRAM_DAYS, WEEK_COUNT,
};
use crate::{PRODUCER_NAME, TALLY_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current scoreboard schema version
pub const SCOREBOARD_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Program shape the scores were computed against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramInfo {
    pub days: u32,
    pub weeks: u32,
    pub days_per_week: u32,
    pub habit_count: usize,
    /// Best possible grand total for one user
    pub max_score: f64,
}

/// Complete scoreboard payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardPayload {
    pub scoreboard_version: String,
    pub producer: ScoreboardProducer,
    pub computed_at_utc: String,
    pub program: ProgramInfo,
    pub habits: Vec<Habit>,
    pub rankings: Vec<RankingRow>,
    pub cards: Vec<UserScoreCard>,
}

/// Encoder for scoreboard payloads
pub struct ScoreboardEncoder {
    instance_id: String,
}

impl Default for ScoreboardEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreboardEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Compute and encode a scoreboard for every user in the snapshot
    pub fn encode(&self, snapshot: &Snapshot) -> ScoreboardPayload {
        let engine = ScoreEngine::new(snapshot);
        let rankings = engine.rankings();
        let cards = engine.score_cards();

        ScoreboardPayload {
            scoreboard_version: SCOREBOARD_VERSION.to_string(),
            producer: ScoreboardProducer {
                name: PRODUCER_NAME.to_string(),
                version: TALLY_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            program: ProgramInfo {
                days: PROGRAM_DAYS,
                weeks: WEEK_COUNT,
                days_per_week: DAYS_PER_WEEK,
                habit_count: snapshot.habits.len(),
                max_score: max_program_score(&snapshot.habits),
            },
            habits: snapshot.habits.clone(),
            rankings,
            cards,
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(&self, snapshot: &Snapshot) -> Result<String, ComputeError> {
        let payload = self.encode(snapshot);
        serde_json::to_string_pretty(&payload).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
