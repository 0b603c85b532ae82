//! Entry storage
//!
//! This module defines the storage seam the tracker writes through and an
//! in-memory implementation. Stores hold at most one value per
//! `(user_id, habit_id, day)`; a new write replaces the old value.

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::default_catalog;
use crate::types::{EntryKey, EntryValue, Habit, HabitEntry, Snapshot, User};

/// Storage backend for users, the habit catalog and entries
pub trait HabitStore {
    /// Habit catalog in display order
    fn habits(&self) -> Vec<Habit>;

    /// Users in registration order
    fn users(&self) -> Vec<User>;

    fn entries(&self) -> Vec<HabitEntry>;

    /// Insert a user, or replace the one with the same id in place
    fn upsert_user(&mut self, user: User);

    /// Write an entry, returning the value it replaced
    fn upsert_entry(&mut self, entry: HabitEntry) -> Option<EntryValue>;

    /// Remove a user and all of their entries
    fn remove_user(&mut self, user_id: &str) -> bool;

    /// Copy the current state into an immutable snapshot
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            habits: self.habits(),
            users: self.users(),
            entries: self.entries(),
        }
    }
}

/// In-memory store
///
/// Entries live in a `BTreeMap` so snapshots list them in a stable order.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStore {
    habits: Vec<Habit>,
    users: Vec<User>,
    entries: BTreeMap<EntryKey, EntryValue>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_catalog(default_catalog())
    }
}

impl MemoryStore {
    /// Create an empty store with the program catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with a custom catalog
    pub fn with_catalog(habits: Vec<Habit>) -> Self {
        Self {
            habits,
            users: Vec::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Build a store from a snapshot; later duplicate entries win
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::with_catalog(snapshot.habits);
        for user in snapshot.users {
            store.upsert_user(user);
        }
        for entry in snapshot.entries {
            store.upsert_entry(entry);
        }
        store
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Load store from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Snapshot::from_json(json).map(Self::from_snapshot)
    }

    /// Serialize store to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        self.snapshot().to_json()
    }
}

impl HabitStore for MemoryStore {
    fn habits(&self) -> Vec<Habit> {
        self.habits.clone()
    }

    fn users(&self) -> Vec<User> {
        self.users.clone()
    }

    fn entries(&self) -> Vec<HabitEntry> {
        self.entries
            .iter()
            .map(|(key, value)| HabitEntry {
                user_id: key.user_id.clone(),
                habit_id: key.habit_id,
                day: key.day,
                value: *value,
            })
            .collect()
    }

    fn upsert_user(&mut self, user: User) {
        match self.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => self.users.push(user),
        }
    }

    fn upsert_entry(&mut self, entry: HabitEntry) -> Option<EntryValue> {
        let previous = self.entries.insert(entry.key(), entry.value);
        debug!(
            user_id = %entry.user_id,
            habit_id = entry.habit_id,
            day = entry.day.index(),
            value = entry.value.as_u8(),
            replaced = previous.is_some(),
            "stored entry"
        );
        previous
    }

    fn remove_user(&mut self, user_id: &str) -> bool {
        let before = self.users.len();
        self.users.retain(|u| u.id != user_id);
        self.entries.retain(|key, _| key.user_id != user_id);
        self.users.len() != before
    }
}
