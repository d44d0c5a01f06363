//! Rating transitions.
//!
//! `apply_rating` is a pure function of `(state, rating, now, config)`: it never
//! touches the input state, reads no clock and no global configuration. Callers
//! own persistence.
//!
//! Queue behavior:
//! - **new/learn**: Again restarts the steps, Good walks them and graduates past the
//!   last one, Easy graduates immediately. Hard on the first step graduates with a
//!   reduced interval; later it repeats the current step.
//! - **review**: Again lapses into relearn, Hard/Good/Easy grow the interval by
//!   the hard factor, the ease, or ease times the easy factor.
//! - **relearn**: Again/Hard repeat the lapse step, Good/Easy return to review at
//!   70% of the previous interval.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{MIN_EASE, SchedulerConfig};
use crate::domain::{QueueStatus, Rating, SchedulingState};

/// Ease lost on a lapse.
pub const LAPSE_EASE_PENALTY: f64 = 0.2;

/// Ease lost on a Hard review, and gained on an Easy one.
pub const EASE_STEP: f64 = 0.15;

/// Share of the previous interval kept when a relearning card returns to review.
pub const RELEARN_INTERVAL_FACTOR: f64 = 0.7;

/// Upper bound on any interval (100 years).
///
/// This is a deliberate extension to the SM-2 style formulas, which have no
/// ceiling: it keeps `now + interval` representable for very old cards.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Outcome of applying one rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    /// State after the rating
    pub state_after: SchedulingState,
    pub interval_before: u32,
    pub interval_after: u32,
    pub ease_before: f64,
    pub ease_after: f64,

    /// Whole days between the previous due time and `now`, floored at zero
    pub elapsed_days: u32,

    pub rating: Rating,

    /// Set by the orchestrator when this grade tagged the card as a leech
    pub became_leech: bool,

    /// True when a review card was forgotten
    pub was_lapse: bool,
}

/// Compute the state that follows `state` when graded with `rating` at `now`.
pub fn apply_rating(state: &SchedulingState, rating: Rating, now: DateTime<Utc>, config: &SchedulerConfig) -> GradeResult {
    let mut next = state.clone();

    let was_lapse = match state.queue_status {
        QueueStatus::New | QueueStatus::Learn => {
            apply_learning(&mut next, rating, now, config);
            false
        }
        QueueStatus::Review => apply_review(&mut next, rating, now, config),
        QueueStatus::Relearn => {
            apply_relearn(&mut next, rating, now, config);
            false
        }
    };
    next.last_rating = Some(rating);

    log::debug!(
        "card {}: {} -> {} on {} (interval {} -> {}, ease {:.2} -> {:.2})",
        state.card_id,
        state.queue_status,
        next.queue_status,
        rating,
        state.interval_days,
        next.interval_days,
        state.ease,
        next.ease
    );

    GradeResult {
        interval_before: state.interval_days,
        interval_after: next.interval_days,
        ease_before: state.ease,
        ease_after: next.ease,
        elapsed_days: elapsed_days(state.due_at, now),
        rating,
        became_leech: false,
        was_lapse,
        state_after: next,
    }
}

/// Returns true once a card has lapsed often enough to be a leech.
pub fn is_leech(state: &SchedulingState, config: &SchedulerConfig) -> bool {
    state.lapses >= config.leech_threshold
}

/// Whole days from `due_at` to `now`, zero if not yet due or never scheduled.
pub fn elapsed_days(due_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    match due_at {
        Some(due) => {
            let seconds = (now - due).num_seconds().max(0);
            u32::try_from(seconds / 86_400).unwrap_or(u32::MAX)
        }
        None => 0,
    }
}

fn apply_learning(state: &mut SchedulingState, rating: Rating, now: DateTime<Utc>, config: &SchedulerConfig) {
    let steps = config.step_count();

    match rating {
        Rating::Again => {
            state.queue_status = QueueStatus::Learn;
            state.learning_step_index = 0;
            state.due_at = Some(add_minutes(now, config.step_minutes(0)));
        }
        Rating::Hard => {
            if state.learning_step_index == 0 {
                let days = round_days(config.graduating_interval_days as f64 * config.hard_graduating_interval_factor)
                    .max(config.hard_min_days);
                graduate(state, now, days);
            } else {
                let index = state.learning_step_index.min(steps - 1);
                state.queue_status = QueueStatus::Learn;
                state.learning_step_index = index;
                state.due_at = Some(add_minutes(now, config.step_minutes(index)));
            }
        }
        Rating::Good => {
            let index = state.learning_step_index;
            if index >= steps {
                graduate(state, now, config.graduating_interval_days);
            } else {
                state.queue_status = QueueStatus::Learn;
                state.due_at = Some(add_minutes(now, config.step_minutes(index)));
                state.learning_step_index = index + 1;
            }
        }
        Rating::Easy => {
            graduate(state, now, config.easy_graduating_days().max(1));
        }
    }
}

fn graduate(state: &mut SchedulingState, now: DateTime<Utc>, interval_days: u32) {
    state.queue_status = QueueStatus::Review;
    state.learning_step_index = 0;
    state.reps += 1;
    state.interval_days = clamp_interval(interval_days);
    state.due_at = Some(add_days(now, state.interval_days));
}

/// Returns true if the rating was a lapse.
fn apply_review(state: &mut SchedulingState, rating: Rating, now: DateTime<Utc>, config: &SchedulerConfig) -> bool {
    state.reps += 1;

    let interval = match rating {
        Rating::Again => {
            state.lapses += 1;
            state.queue_status = QueueStatus::Relearn;
            state.learning_step_index = 0;
            state.due_at = Some(add_minutes(now, config.lapse_step_minutes));
            state.ease = clamp_ease(state.ease - LAPSE_EASE_PENALTY);
            return true;
        }
        Rating::Hard => {
            state.ease = clamp_ease(state.ease - EASE_STEP);
            let base = state.interval_days.max(1) as f64;
            round_days(base * config.hard_interval_factor).max(config.hard_min_days)
        }
        Rating::Good => {
            let base = state.interval_days.max(config.graduating_interval_days) as f64;
            round_days(base * state.ease).max(1)
        }
        Rating::Easy => {
            state.ease = clamp_ease(state.ease + EASE_STEP);
            let base = state.interval_days.max(config.graduating_interval_days) as f64;
            let good_interval = round_days(base * state.ease).max(1);
            let bonus_interval = round_days(base * state.ease * config.easy_interval_factor).max(1);
            good_interval.saturating_add(config.easy_bonus_days).max(bonus_interval)
        }
    };

    state.interval_days = clamp_interval(interval);
    state.queue_status = QueueStatus::Review;
    state.learning_step_index = 0;
    state.due_at = Some(add_days(now, state.interval_days));
    false
}

fn apply_relearn(state: &mut SchedulingState, rating: Rating, now: DateTime<Utc>, config: &SchedulerConfig) {
    let previous = state.interval_days.max(1) as f64;

    let interval = match rating {
        Rating::Again | Rating::Hard => {
            state.due_at = Some(add_minutes(now, config.lapse_step_minutes));
            state.learning_step_index = 0;
            return;
        }
        Rating::Good => round_days(previous * RELEARN_INTERVAL_FACTOR).max(1),
        Rating::Easy => {
            state.ease = clamp_ease(state.ease + EASE_STEP);
            round_days(previous * RELEARN_INTERVAL_FACTOR)
                .max(1)
                .saturating_add(config.easy_bonus_days)
        }
    };

    state.interval_days = clamp_interval(interval);
    state.queue_status = QueueStatus::Review;
    state.learning_step_index = 0;
    state.due_at = Some(add_days(now, state.interval_days));
    state.reps += 1;
}

/// Round half away from zero, saturating into `u32`.
fn round_days(value: f64) -> u32 {
    let rounded = value.round();
    if rounded <= 0.0 {
        0
    } else if rounded >= u32::MAX as f64 {
        u32::MAX
    } else {
        rounded as u32
    }
}

fn clamp_ease(ease: f64) -> f64 {
    ease.max(MIN_EASE)
}

fn clamp_interval(days: u32) -> u32 {
    days.clamp(1, MAX_INTERVAL_DAYS)
}

fn add_minutes(now: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    now + Duration::minutes(i64::from(minutes))
}

fn add_days(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now + Duration::days(i64::from(days))
}
