//! Undo history for study sessions.
//!
//! Each user gets one bounded LIFO of grades, tied to the scope it was recorded
//! in. Switching scope starts a fresh history.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::domain::{Rating, ReviewLogEntry, StateSnapshot};
use crate::error::{Result, ReviewrError};
use crate::scheduler::Scope;

/// Maximum number of grades that can be undone.
pub const HISTORY_LIMIT: usize = 20;

/// Everything needed to reverse one grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub card_id: String,
    pub scope_key: String,
    pub review_id: String,
    pub rating: Rating,
    pub state_before: StateSnapshot,
    pub tags_before: Vec<String>,
}

impl HistoryEntry {
    /// Build the undo record for a logged grade.
    pub fn from_review(review: &ReviewLogEntry, scope: &Scope) -> Self {
        Self {
            card_id: review.card_id.clone(),
            scope_key: scope.scope_key(),
            review_id: review.id.clone(),
            rating: review.rating,
            state_before: review.state_before.clone(),
            tags_before: review.tags_before.clone(),
        }
    }
}

/// Bounded LIFO of grades for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UndoHistory {
    scope_key: Option<String>,
    entries: VecDeque<HistoryEntry>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope the history currently belongs to.
    pub fn scope_key(&self) -> Option<&str> {
        self.scope_key.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind the history to `scope`, clearing it if it belonged to another one.
    ///
    /// Returns true if entries were discarded.
    pub fn ensure_scope(&mut self, scope: &Scope) -> bool {
        let key = scope.scope_key();
        if self.scope_key.as_deref() == Some(key.as_str()) {
            return false;
        }
        let discarded = !self.entries.is_empty();
        if discarded {
            log::info!(
                "Scope changed to {}, discarding {} undo entries",
                key,
                self.entries.len()
            );
        }
        self.entries.clear();
        self.scope_key = Some(key);
        discarded
    }

    /// Record a grade, evicting the oldest entry past the limit.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.scope_key.as_deref() != Some(entry.scope_key.as_str()) {
            self.entries.clear();
            self.scope_key = Some(entry.scope_key.clone());
        }
        self.entries.push_back(entry);
        while self.entries.len() > HISTORY_LIMIT {
            self.entries.pop_front();
        }
    }

    /// Pop the most recent entry recorded in `scope`.
    ///
    /// Entries from other scopes on top of it are discarded.
    pub fn pop_matching(&mut self, scope: &Scope) -> Option<HistoryEntry> {
        let key = scope.scope_key();
        while let Some(entry) = self.entries.pop_back() {
            if entry.scope_key == key {
                return Some(entry);
            }
            log::debug!("Dropping undo entry for {} recorded in {}", entry.card_id, entry.scope_key);
        }
        None
    }

    /// Put back an entry whose undo failed.
    pub fn restore_entry(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
    }
}

/// Undo histories of all users, keyed by user id.
#[derive(Debug, Default)]
pub struct UndoHistories {
    histories: Mutex<HashMap<String, UndoHistory>>,
}

impl UndoHistories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the history of `user_id` under the registry lock.
    pub fn with_history<T>(&self, user_id: &str, f: impl FnOnce(&mut UndoHistory) -> T) -> Result<T> {
        let mut histories = self
            .histories
            .lock()
            .map_err(|e| ReviewrError::Storage(e.to_string()))?;
        Ok(f(histories.entry(user_id.to_string()).or_default()))
    }

    /// Take the history of `user_id` out of the registry.
    pub fn take(&self, user_id: &str) -> Result<UndoHistory> {
        self.with_history(user_id, std::mem::take)
    }

    /// Store a history for `user_id`, replacing any previous one.
    pub fn put(&self, user_id: &str, history: UndoHistory) -> Result<()> {
        self.with_history(user_id, |slot| *slot = history)
    }
}
