//! Per-card exclusive locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{Result, ReviewrError};

/// In-process lock table keyed by card id.
///
/// Holding a card's lock serializes every read-modify-write of that card's
/// state within this process. Other processes are caught by the version check
/// on write.
#[derive(Debug, Default)]
pub struct CardLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CardLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `card_id`.
    pub fn with_lock<T>(&self, card_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|e| ReviewrError::Storage(e.to_string()))?;
            Arc::clone(locks.entry(card_id.to_string()).or_default())
        };
        let _guard = lock.lock().map_err(|e| ReviewrError::Storage(e.to_string()))?;
        f()
    }

    /// Drop the lock entry of a deleted card.
    pub fn forget(&self, card_id: &str) -> Result<()> {
        let mut locks = self.locks.lock().map_err(|e| ReviewrError::Storage(e.to_string()))?;
        locks.remove(card_id);
        Ok(())
    }
}
