//! Scheduling-state storage helpers.

use super::traits::Storage;
use crate::config::SchedulerConfig;
use crate::domain::SchedulingState;
use crate::error::{Result, ReviewrError};

/// Collection name for scheduling states. States are keyed by card id.
pub const STATES_COLLECTION: &str = "states";

/// Helper for scheduling-state reads and versioned writes.
pub struct StateStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> StateStore<'a, S> {
    /// Create a new StateStore wrapping the given storage.
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Get the state of a card, if one was ever persisted.
    pub fn get(&self, card_id: &str) -> Result<Option<SchedulingState>> {
        self.storage.get(STATES_COLLECTION, card_id)
    }

    /// Get the state of a card, failing with `StateNotFound` if none exists.
    pub fn require(&self, card_id: &str) -> Result<SchedulingState> {
        self.get(card_id)?
            .ok_or_else(|| ReviewrError::StateNotFound(card_id.to_string()))
    }

    /// Get the state of a card, persisting a fresh `new` state first if needed.
    ///
    /// If another writer creates the state between the read and the create, the
    /// stored record wins and is returned.
    pub fn get_or_create(&self, card_id: &str, config: &SchedulerConfig) -> Result<SchedulingState> {
        if let Some(state) = self.get(card_id)? {
            return Ok(state);
        }

        let state = SchedulingState::new(card_id, config);
        match self.storage.create(STATES_COLLECTION, &state) {
            Ok(()) => {
                log::debug!("Created scheduling state for card {}", card_id);
                Ok(state)
            }
            Err(ReviewrError::Conflict(_)) => self.require(card_id),
            Err(e) => Err(e),
        }
    }

    /// Persist `state` if the stored version still equals `state.version`.
    ///
    /// Returns the record as written, with its version bumped.
    pub fn save_checked(&self, state: &SchedulingState) -> Result<SchedulingState> {
        let mut next = state.clone();
        next.version = state.version + 1;
        self.storage
            .compare_and_update(STATES_COLLECTION, &state.card_id, state.version, &next)
            .map_err(|e| match e {
                ReviewrError::RecordNotFound { .. } => ReviewrError::StateNotFound(state.card_id.clone()),
                other => other,
            })?;
        Ok(next)
    }

    /// List all states.
    pub fn list_all(&self) -> Result<Vec<SchedulingState>> {
        self.storage.list(STATES_COLLECTION)
    }

    /// Delete the state of a card. Returns false if there was none.
    pub fn delete(&self, card_id: &str) -> Result<bool> {
        match self.storage.delete(STATES_COLLECTION, card_id) {
            Ok(()) => Ok(true),
            Err(ReviewrError::RecordNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
