//! habit.entry.v1 input schema
//!
//! This module defines the loosely typed entry records accepted from outer
//! surfaces (JSON bodies, NDJSON files) and validates them into
//! [`HabitEntry`](crate::types::HabitEntry) values before they reach storage.

mod adapter;
mod entry_record;

pub use adapter::*;
pub use entry_record::*;
