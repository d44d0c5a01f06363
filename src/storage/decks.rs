//! Deck-specific storage helpers.

use super::traits::Storage;
use crate::domain::Deck;
use crate::error::{Result, ReviewrError};

/// Collection name for decks.
pub const DECKS_COLLECTION: &str = "decks";

/// Helper for deck-specific queries.
pub struct DeckStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> DeckStore<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub fn get(&self, id: &str) -> Result<Option<Deck>> {
        self.storage.get(DECKS_COLLECTION, id)
    }

    /// Get a deck by ID, failing with `DeckNotFound` if it is missing.
    pub fn require(&self, id: &str) -> Result<Deck> {
        self.get(id)?.ok_or_else(|| ReviewrError::DeckNotFound(id.to_string()))
    }

    pub fn create(&self, deck: &Deck) -> Result<()> {
        self.storage.create(DECKS_COLLECTION, deck)
    }

    pub fn list_all(&self) -> Result<Vec<Deck>> {
        self.storage.list(DECKS_COLLECTION)
    }
}
