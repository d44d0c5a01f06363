//! Domain types for Reviewr
//!
//! This module contains all core domain types:
//! - Rating: Again/Hard/Good/Easy
//! - SchedulingState: per-card scheduling metadata and its undo snapshot
//! - Card / Deck: the scheduler's view of cards and the deck hierarchy
//! - ReviewLogEntry: audit record written for every grade

pub mod card;
pub mod deck;
pub mod rating;
pub mod review_log;
pub mod state;

pub use card::{Card, LEECH_TAG};
pub use deck::{Deck, descendant_ids};
pub use rating::Rating;
pub use review_log::ReviewLogEntry;
pub use state::{QueueStatus, SchedulingState, StateSnapshot};
