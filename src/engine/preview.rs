//! Due-date previews for the rating buttons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transition::apply_rating;
use crate::config::SchedulerConfig;
use crate::domain::{Rating, SchedulingState};

/// What pressing one rating button would do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingPreview {
    pub rating: Rating,
    pub label: String,
    pub due_at: Option<DateTime<Utc>>,
    /// Short human-readable delay, e.g. "10 min" or "3 d"
    pub humanized: String,
}

/// Preview all four ratings against `state` without changing it.
pub fn preview_all(state: &SchedulingState, now: DateTime<Utc>, config: &SchedulerConfig) -> Vec<RatingPreview> {
    Rating::ALL
        .iter()
        .map(|&rating| {
            let due_at = apply_rating(state, rating, now, config).state_after.due_at;
            RatingPreview {
                rating,
                label: rating.label().to_string(),
                due_at,
                humanized: humanize_due(now, due_at),
            }
        })
        .collect()
}

/// Format the delay between `now` and `due_at`.
pub fn humanize_due(now: DateTime<Utc>, due_at: Option<DateTime<Utc>>) -> String {
    let Some(due_at) = due_at else {
        return "Later".to_string();
    };
    let seconds = (due_at - now).num_seconds();
    if seconds <= 0 {
        return "Now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} h", hours);
    }
    let days = hours / 24;
    if days < 7 {
        return format!("{} d", days);
    }
    let weeks = days / 7;
    if weeks < 8 {
        return format!("{} w", weeks);
    }
    let months = days / 30;
    if months < 18 {
        return format!("{} mo", months);
    }
    format!("{} y", days / 365)
}
