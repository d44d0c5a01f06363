//! Queue scheduling: which card to study next, and how much is left today.
//!
//! This module provides:
//! - **Scopes**: all cards, a deck subtree, or a tag
//! - **QueueSelector**: picks the next card (learning, then review, then new)
//! - **Summaries**: today's counts and per-day activity, on study-day boundaries

mod scope;
mod select;
mod summary;

pub use scope::{Scope, ScopeFilter};
pub use select::{QueueSelector, ScheduledCard};
pub use summary::{DayActivity, MAX_ACTIVITY_DAYS, TodaySummary, daily_activity, study_day, study_day_start};
