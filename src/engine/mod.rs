//! Scheduling engine.
//!
//! Pure transition logic: given a state, a rating, a clock reading and a config,
//! compute the next state. Nothing here reads the wall clock, global settings or
//! storage, so every function is safe to call from any thread.

mod preview;
mod transition;

pub use preview::{RatingPreview, humanize_due, preview_all};
pub use transition::{
    EASE_STEP, GradeResult, LAPSE_EASE_PENALTY, MAX_INTERVAL_DAYS, RELEARN_INTERVAL_FACTOR, apply_rating,
    elapsed_days, is_leech,
};
