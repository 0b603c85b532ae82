//! habit-tally - Scoring engine for a 56-day habit-tracking program
//!
//! Users record a 0/1/2 completion level per habit per day. habit-tally turns
//! those entries into per-habit scores, 14-day weekly rollups, grand totals,
//! completion rates and a leaderboard.
//!
//! ## Modules
//!
//! - **Engine**: pure aggregation and ranking over a snapshot
//! - **Schema / Store**: validated entry records and last-write-wins storage
//! - **Pipeline**: one-shot JSON entry points and a stateful tracker

pub mod calendar;
pub mod catalog;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod scoring;
pub mod store;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use calendar::ProgramCalendar;
pub use engine::ScoreEngine;
pub use error::{ComputeError, ValidationError};
pub use pipeline::{rankings_from_json, scoreboard_from_json, HabitTracker};
pub use store::{HabitStore, MemoryStore};

// Schema exports
pub use schema::{EntryRecord, EntryRecordAdapter, SCHEMA_VERSION};

/// habit-tally version embedded in scoreboard payloads
pub const TALLY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for scoreboard payloads
pub const PRODUCER_NAME: &str = "habit-tally";
