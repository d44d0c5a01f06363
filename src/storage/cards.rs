//! Card-specific storage helpers.

use super::traits::Storage;
use crate::domain::Card;
use crate::error::{Result, ReviewrError};

/// Collection name for cards.
pub const CARDS_COLLECTION: &str = "cards";

/// Helper for card-specific queries.
pub struct CardStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> CardStore<'a, S> {
    /// Create a new CardStore wrapping the given storage.
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Get a card by ID.
    pub fn get(&self, id: &str) -> Result<Option<Card>> {
        self.storage.get(CARDS_COLLECTION, id)
    }

    /// Get a card by ID, failing with `CardNotFound` if it is missing.
    pub fn require(&self, id: &str) -> Result<Card> {
        self.get(id)?.ok_or_else(|| ReviewrError::CardNotFound(id.to_string()))
    }

    /// Create a new card.
    pub fn create(&self, card: &Card) -> Result<()> {
        self.storage.create(CARDS_COLLECTION, card)
    }

    /// Update an existing card.
    pub fn update(&self, card: &Card) -> Result<()> {
        self.storage
            .update(CARDS_COLLECTION, &card.id, card)
            .map_err(|e| match e {
                ReviewrError::RecordNotFound { .. } => ReviewrError::CardNotFound(card.id.clone()),
                other => other,
            })
    }

    /// Delete a card.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.storage.delete(CARDS_COLLECTION, id).map_err(|e| match e {
            ReviewrError::RecordNotFound { .. } => ReviewrError::CardNotFound(id.to_string()),
            other => other,
        })
    }

    /// List all cards.
    pub fn list_all(&self) -> Result<Vec<Card>> {
        self.storage.list(CARDS_COLLECTION)
    }

}
