//! Storage layer for Reviewr.
//!
//! `Storage` is a small collection/record abstraction with two backends:
//! - `JsonlStorage`: one JSONL file per collection with an in-memory cache
//! - `SqliteStorage`: a single SQLite table via rusqlite
//!
//! The typed stores (`CardStore`, `DeckStore`, `StateStore`, `ReviewLogStore`)
//! wrap a backend with per-collection queries.

mod cards;
mod decks;
mod jsonl;
mod reviews;
mod sqlite;
mod states;
mod traits;

pub use cards::{CARDS_COLLECTION, CardStore};
pub use decks::{DECKS_COLLECTION, DeckStore};
pub use jsonl::JsonlStorage;
pub use reviews::{REVIEWS_COLLECTION, ReviewLogStore};
pub use sqlite::{DB_FILE, SqliteStorage};
pub use states::{STATES_COLLECTION, StateStore};
pub use traits::{Filter, FilterOp, HasId, Storage, VERSION_FIELD, record_version};
