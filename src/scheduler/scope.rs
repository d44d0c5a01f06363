//! Study scopes: which cards a session draws from.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{Card, Deck, descendant_ids};
use crate::error::ReviewrError;

/// The set of cards a study session works on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum Scope {
    /// Every card
    #[default]
    All,
    /// A deck and all of its descendants
    Deck(String),
    /// Cards carrying a tag
    Tag(String),
}

impl Scope {
    /// Stable key identifying the scope; undo histories are keyed by it.
    pub fn scope_key(&self) -> String {
        match self {
            Scope::All => "all".to_string(),
            Scope::Deck(id) => format!("deck:{}", id),
            Scope::Tag(tag) => format!("tag:{}", tag),
        }
    }

    /// Resolve the scope against the deck hierarchy.
    pub fn resolve(&self, decks: &[Deck]) -> ScopeFilter {
        match self {
            Scope::All => ScopeFilter::All,
            Scope::Deck(id) => ScopeFilter::Decks(descendant_ids(id, decks)),
            Scope::Tag(tag) => ScopeFilter::Tag(tag.clone()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scope_key())
    }
}

impl FromStr for Scope {
    type Err = ReviewrError;

    /// Parse a scope key (`all`, `deck:<id>`, `tag:<name>`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "all" {
            return Ok(Scope::All);
        }
        match s.split_once(':') {
            Some(("deck", id)) if !id.is_empty() => Ok(Scope::Deck(id.to_string())),
            Some(("tag", tag)) if !tag.is_empty() => Ok(Scope::Tag(tag.to_string())),
            _ => Err(ReviewrError::InvalidScope(s.to_string())),
        }
    }
}

/// A scope resolved to a card predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeFilter {
    All,
    Decks(HashSet<String>),
    Tag(String),
}

impl ScopeFilter {
    pub fn matches(&self, card: &Card) -> bool {
        match self {
            ScopeFilter::All => true,
            ScopeFilter::Decks(ids) => ids.contains(&card.deck_id),
            ScopeFilter::Tag(tag) => card.has_tag(tag),
        }
    }
}
