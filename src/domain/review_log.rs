//! Review log entries.
//!
//! One entry is written per grading call. Entries are never modified; undo deletes
//! the entry it reverts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::rating::Rating;
use crate::domain::state::StateSnapshot;
use crate::storage::HasId;

/// Audit record of one applied rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    pub id: String,
    pub card_id: String,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,

    /// Whole days the card was overdue when graded
    pub elapsed_days: u32,

    pub interval_before: u32,
    pub interval_after: u32,
    pub ease_before: f64,
    pub ease_after: f64,

    /// Scheduling fields before the rating was applied
    pub state_before: StateSnapshot,

    /// Card tags before the rating was applied
    #[serde(default)]
    pub tags_before: Vec<String>,
}

impl HasId for ReviewLogEntry {
    fn id(&self) -> &str {
        &self.id
    }
}
