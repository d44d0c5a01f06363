//! Review-log storage helpers.

use chrono::{DateTime, Utc};

use super::traits::{Filter, Storage};
use crate::domain::ReviewLogEntry;
use crate::error::Result;

/// Collection name for review log entries.
pub const REVIEWS_COLLECTION: &str = "reviews";

/// Helper for the append-mostly review log.
pub struct ReviewLogStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> ReviewLogStore<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Append an entry.
    pub fn append(&self, entry: &ReviewLogEntry) -> Result<()> {
        self.storage.create(REVIEWS_COLLECTION, entry)
    }

    pub fn get(&self, id: &str) -> Result<Option<ReviewLogEntry>> {
        self.storage.get(REVIEWS_COLLECTION, id)
    }

    /// Delete an entry. Returns false if it was already gone.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .storage
            .delete_where(REVIEWS_COLLECTION, &[Filter::eq("id", id)])?;
        Ok(removed > 0)
    }

    /// All entries for a card, oldest first.
    pub fn list_for_card(&self, card_id: &str) -> Result<Vec<ReviewLogEntry>> {
        let mut entries: Vec<ReviewLogEntry> = self
            .storage
            .query(REVIEWS_COLLECTION, &[Filter::eq("card_id", card_id)])?;
        entries.sort_by_key(|e| e.reviewed_at);
        Ok(entries)
    }

    /// Delete every entry for a card.
    pub fn delete_for_card(&self, card_id: &str) -> Result<usize> {
        self.storage
            .delete_where(REVIEWS_COLLECTION, &[Filter::eq("card_id", card_id)])
    }

    /// Entries with `from <= reviewed_at < to`, oldest first.
    pub fn list_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<ReviewLogEntry>> {
        let mut entries: Vec<ReviewLogEntry> = self
            .storage
            .list::<ReviewLogEntry>(REVIEWS_COLLECTION)?
            .into_iter()
            .filter(|e| e.reviewed_at >= from && e.reviewed_at < to)
            .collect();
        entries.sort_by_key(|e| e.reviewed_at);
        Ok(entries)
    }
}
