//! Study-day arithmetic and queue counts.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::scope::ScopeFilter;
use super::select::ScheduledCard;
use crate::domain::{QueueStatus, ReviewLogEntry};

/// Counts shown at the top of a study session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodaySummary {
    /// Cards never studied
    pub new_count: usize,
    /// Review cards that are due
    pub review_count: usize,
    /// Learning and review cards that are due
    pub due_count: usize,
}

impl TodaySummary {
    /// Count the cards in `scope` at `now`.
    pub fn compute(cards: &[ScheduledCard], now: DateTime<Utc>, scope: &ScopeFilter) -> Self {
        let mut summary = Self::default();
        for c in cards.iter().filter(|c| scope.matches(&c.card)) {
            let due = c.state.is_due(now);
            match c.state.queue_status {
                QueueStatus::New => summary.new_count += 1,
                QueueStatus::Review if due => {
                    summary.review_count += 1;
                    summary.due_count += 1;
                }
                QueueStatus::Learn | QueueStatus::Relearn if due => summary.due_count += 1,
                _ => {}
            }
        }
        summary
    }
}

/// One study day of activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayActivity {
    pub day: NaiveDate,
    /// Reviews logged during the day
    pub reviews: usize,
    /// Cards falling due during the day (overdue cards count toward today)
    pub due: usize,
}

/// Start of the study day containing `now`.
///
/// Study days begin at `cutoff_hour` UTC rather than at midnight.
pub fn study_day_start(now: DateTime<Utc>, cutoff_hour: u32) -> DateTime<Utc> {
    let start = now
        .date_naive()
        .and_hms_opt(cutoff_hour.min(23), 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now);
    if start > now { start - Duration::days(1) } else { start }
}

/// The study day a timestamp belongs to, named by the date it starts on.
pub fn study_day(at: DateTime<Utc>, cutoff_hour: u32) -> NaiveDate {
    study_day_start(at, cutoff_hour).date_naive()
}

/// Longest span `daily_activity` reports on (about ten years).
pub const MAX_ACTIVITY_DAYS: u32 = 3660;

/// Per-day review and due counts for every study day in `from..=to`.
pub fn daily_activity(
    from: NaiveDate,
    to: NaiveDate,
    now: DateTime<Utc>,
    cutoff_hour: u32,
    logs: &[ReviewLogEntry],
    cards: &[ScheduledCard],
) -> Vec<DayActivity> {
    let mut days: BTreeMap<NaiveDate, DayActivity> = from
        .iter_days()
        .take_while(|day| *day <= to)
        .map(|day| (day, DayActivity { day, reviews: 0, due: 0 }))
        .collect();

    for entry in logs {
        if let Some(activity) = days.get_mut(&study_day(entry.reviewed_at, cutoff_hour)) {
            activity.reviews += 1;
        }
    }

    let today = study_day(now, cutoff_hour);
    for c in cards {
        if c.state.queue_status == QueueStatus::New {
            continue;
        }
        let Some(due_at) = c.state.due_at else {
            continue;
        };
        let day = study_day(due_at, cutoff_hour).max(today);
        if let Some(activity) = days.get_mut(&day) {
            activity.due += 1;
        }
    }

    days.into_values().collect()
}
