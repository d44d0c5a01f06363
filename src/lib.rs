//! Reviewr - a spaced-repetition scheduling engine
//!
//! Reviewr decides when each flashcard should be shown next and how its ease
//! and interval evolve with every rating. The engine itself is pure; the review
//! orchestrator adds persistence, leech tagging and a scoped undo history.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod id;
pub mod review;
pub mod scheduler;
pub mod storage;

pub use error::{Result, ReviewrError};
