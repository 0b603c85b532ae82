//! Error types for habit-tally

use thiserror::Error;

/// Errors that can occur while recording entries or building reports
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid entry: {0}")]
    InvalidEntry(#[from] ValidationError),

    #[error("Unknown habit: {0}")]
    UnknownHabit(u32),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// Rejections raised at the entry-write boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("entry value must be 0, 1 or 2, got {0}")]
    InvalidValue(i64),

    #[error("day must be within 0..=55, got {0}")]
    DayOutOfRange(i64),

    #[error("week must be within 0..=3, got {0}")]
    WeekOutOfRange(i64),

    #[error("habit id must be positive, got {0}")]
    InvalidHabitId(i64),

    #[error("user id is empty")]
    MissingUser,

    #[error("entry has neither a day nor a date")]
    MissingDay,

    #[error("date {0} is outside the program")]
    DateOutsideProgram(String),

    #[error("entry has a date but no program start date is configured")]
    NoCalendar,

    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },
}
