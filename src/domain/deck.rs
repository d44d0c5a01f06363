//! Deck hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::id::generate_deck_id;
use crate::storage::HasId;

/// A named deck, optionally nested under a parent deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: generate_deck_id(),
            name: name.into(),
            parent_id: None,
            created_at,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Slash-separated path from the root deck, e.g. `Languages/Spanish/Verbs`.
    pub fn full_path(&self, decks: &[Deck]) -> String {
        let by_id: HashMap<&str, &Deck> = decks.iter().map(|d| (d.id.as_str(), d)).collect();
        let mut parts = vec![self.name.as_str()];
        let mut seen: HashSet<&str> = HashSet::from([self.id.as_str()]);
        let mut current = self.parent_id.as_deref();
        while let Some(parent_id) = current {
            // Guard against cycles in corrupted data
            if !seen.insert(parent_id) {
                break;
            }
            match by_id.get(parent_id) {
                Some(parent) => {
                    parts.push(parent.name.as_str());
                    current = parent.parent_id.as_deref();
                }
                None => break,
            }
        }
        parts.reverse();
        parts.join("/")
    }
}

impl HasId for Deck {
    fn id(&self) -> &str {
        &self.id
    }
}

/// IDs of `root` and every deck nested below it.
pub fn descendant_ids(root: &str, decks: &[Deck]) -> HashSet<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for deck in decks {
        if let Some(parent) = deck.parent_id.as_deref() {
            children.entry(parent).or_default().push(deck.id.as_str());
        }
    }

    let mut visited = HashSet::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        if !visited.insert(current.to_string()) {
            continue;
        }
        if let Some(kids) = children.get(current) {
            stack.extend(kids.iter().copied());
        }
    }
    visited
}
