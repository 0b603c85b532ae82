//! Adapter for reading habit.entry.v1 records
//!
//! Parses JSON arrays and NDJSON streams of [`EntryRecord`]s and converts
//! them into validated [`HabitEntry`] values.

use crate::calendar::ProgramCalendar;
use crate::error::{ComputeError, ValidationError};
use crate::schema::entry_record::EntryRecord;
use crate::types::HabitEntry;

/// Adapter for converting entry records to typed entries
pub struct EntryRecordAdapter;

impl EntryRecordAdapter {
    /// Parse a JSON string containing an array of EntryRecords
    pub fn parse_array(json: &str) -> Result<Vec<EntryRecord>, ComputeError> {
        let records: Vec<EntryRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing EntryRecords
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<EntryRecord>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<EntryRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Convert records to typed entries, stopping at the first invalid one
    pub fn to_entries(
        records: &[EntryRecord],
        calendar: Option<&ProgramCalendar>,
    ) -> Result<Vec<HabitEntry>, ComputeError> {
        records
            .iter()
            .map(|record| record.to_entry(calendar).map_err(ComputeError::from))
            .collect()
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(
        records: &[EntryRecord],
        calendar: Option<&ProgramCalendar>,
    ) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                record.to_entry(calendar).err().map(|error| ValidationResult {
                    index: idx,
                    entry_id: record.entry_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub entry_id: Option<String>,
    pub error: ValidationError,
}
