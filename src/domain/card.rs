//! Cards as seen by the scheduler.
//!
//! Content (front/back, media) lives elsewhere; the scheduler only needs identity,
//! placement, tags and creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::generate_card_id;
use crate::storage::HasId;

/// Tag added to cards that have lapsed too often.
pub const LEECH_TAG: &str = "leech";

/// A flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,

    /// Deck the card lives in
    pub deck_id: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Cards generated from the same note share a sibling key
    #[serde(default)]
    pub sibling_key: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Create a new card in a deck.
    pub fn new(deck_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: generate_card_id(),
            deck_id: deck_id.into(),
            tags: Vec::new(),
            sibling_key: None,
            created_at,
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for tag in tags {
            self.add_tag(tag.as_ref());
        }
        self
    }

    pub fn with_sibling_key(mut self, key: impl Into<String>) -> Self {
        self.sibling_key = Some(key.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag.trim())
    }

    /// Add a tag. Returns false if it was blank or already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let normalized = tag.trim();
        if normalized.is_empty() || self.has_tag(normalized) {
            return false;
        }
        self.tags.push(normalized.to_string());
        true
    }

    pub fn is_leech(&self) -> bool {
        self.has_tag(LEECH_TAG)
    }
}

impl HasId for Card {
    fn id(&self) -> &str {
        &self.id
    }
}
