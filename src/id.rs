//! ID generation utilities for Reviewr
//!
//! Provides functions for generating unique identifiers for cards, decks and review log entries.

use chrono::Utc;
use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn random_suffix() -> String {
    let random: u32 = rand::rng().random();
    format!("{:08x}", random)
}

/// Generate a unique card ID
///
/// Format: `{timestamp_ms}-{random_hex}`
/// Example: `1738300800123-a1b2c3d4`
pub fn generate_card_id() -> String {
    format!("{}-{}", now_ms(), random_suffix())
}

/// Generate a deck ID
///
/// Format: `deck-{timestamp_ms}-{random_hex}`
pub fn generate_deck_id() -> String {
    format!("deck-{}-{}", now_ms(), random_suffix())
}

/// Generate a review log entry ID
///
/// Format: `rev-{timestamp_ms}-{random_hex}`
pub fn generate_review_id() -> String {
    format!("rev-{}-{}", now_ms(), random_suffix())
}
