//! Error types for Reviewr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in Reviewr
#[derive(Debug, Error)]
pub enum ReviewrError {
    /// Rating outside of Again/Hard/Good/Easy
    #[error("Invalid rating: {0} (expected 0..=3 or again/hard/good/easy)")]
    InvalidRating(String),

    /// Scope key that is not `all`, `deck:<id>` or `tag:<name>`
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Date range that is reversed or too long to report on
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Scheduler configuration failed validation
    #[error("Config error: {0}")]
    Config(String),

    /// Card not found in storage
    #[error("Card not found: {0}")]
    CardNotFound(String),

    /// Scheduling state not found in storage
    #[error("Scheduling state not found: {0}")]
    StateNotFound(String),

    /// Deck not found in storage
    #[error("Deck not found: {0}")]
    DeckNotFound(String),

    /// Record not found in a storage collection
    #[error("Record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: String },

    /// Concurrent modification detected on write; safe to retry
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl ReviewrError {
    /// Returns true if the operation can be retried after re-reading
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReviewrError::Conflict(_))
    }
}

/// Result type alias for Reviewr operations
pub type Result<T> = std::result::Result<T, ReviewrError>;
