//! Review orchestration.
//!
//! Wraps the pure engine with everything a grade touches:
//! - per-card locking and versioned state writes
//! - leech tagging
//! - the review log
//! - a bounded, scope-bound undo history per user

mod history;
mod locks;
mod orchestrator;
mod session;

pub use history::{HISTORY_LIMIT, HistoryEntry, UndoHistories, UndoHistory};
pub use locks::CardLocks;
pub use orchestrator::{ReviewOrchestrator, UndoOutcome};
pub use session::ReviewSession;
