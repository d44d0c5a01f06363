//! Per-card scheduling state.
//!
//! One `SchedulingState` exists per card. It is created lazily in the `new` queue
//! the first time the card is scheduled, and only the engine (through the
//! orchestrator) changes it afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SchedulerConfig;
use crate::domain::rating::Rating;
use crate::storage::HasId;

/// Which queue a card is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Never studied
    New,
    /// Walking the learning steps
    Learn,
    /// Graduated, scheduled in days
    Review,
    /// Lapsed review card waiting to be relearned
    Relearn,
}

impl QueueStatus {
    /// Returns true for the short-interval queues (learn and relearn)
    pub fn is_learning(&self) -> bool {
        matches!(self, QueueStatus::Learn | QueueStatus::Relearn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::New => "new",
            QueueStatus::Learn => "learn",
            QueueStatus::Review => "review",
            QueueStatus::Relearn => "relearn",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling metadata for one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingState {
    /// Card this state belongs to (also the record id)
    #[serde(rename = "id")]
    pub card_id: String,

    /// Interval multiplier, never below 1.3
    pub ease: f64,

    /// Current interval in days (0 until the card graduates)
    pub interval_days: u32,

    /// Successful repetitions
    pub reps: u32,

    /// Times the card was forgotten from the review queue
    pub lapses: u32,

    /// When the card is next due (None while new)
    pub due_at: Option<DateTime<Utc>>,

    pub queue_status: QueueStatus,

    /// Index into the learning steps
    pub learning_step_index: usize,

    pub last_rating: Option<Rating>,

    /// Write counter used for compare-and-swap updates
    #[serde(default)]
    pub version: u64,
}

impl SchedulingState {
    /// Create the initial state for a card.
    pub fn new(card_id: impl Into<String>, config: &SchedulerConfig) -> Self {
        Self {
            card_id: card_id.into(),
            ease: config.initial_ease,
            interval_days: 0,
            reps: 0,
            lapses: 0,
            due_at: None,
            queue_status: QueueStatus::New,
            learning_step_index: 0,
            last_rating: None,
            version: 0,
        }
    }

    /// Returns true if the card is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at.is_some_and(|due| due <= now)
    }

    /// Capture the fields an undo has to restore.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            queue_status: self.queue_status,
            interval_days: self.interval_days,
            ease: self.ease,
            reps: self.reps,
            lapses: self.lapses,
            due_at: self.due_at,
            learning_step_index: self.learning_step_index,
            last_rating: self.last_rating,
        }
    }

    /// Overwrite the scheduling fields from a snapshot. Identity and version are kept.
    pub fn restore(&mut self, snapshot: &StateSnapshot) {
        self.queue_status = snapshot.queue_status;
        self.interval_days = snapshot.interval_days;
        self.ease = snapshot.ease;
        self.reps = snapshot.reps;
        self.lapses = snapshot.lapses;
        self.due_at = snapshot.due_at;
        self.learning_step_index = snapshot.learning_step_index;
        self.last_rating = snapshot.last_rating;
    }
}

impl HasId for SchedulingState {
    fn id(&self) -> &str {
        &self.card_id
    }
}

/// The scheduling fields of a state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub queue_status: QueueStatus,
    pub interval_days: u32,
    pub ease: f64,
    pub reps: u32,
    pub lapses: u32,
    pub due_at: Option<DateTime<Utc>>,
    pub learning_step_index: usize,
    pub last_rating: Option<Rating>,
}
