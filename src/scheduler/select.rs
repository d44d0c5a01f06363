//! Queue selection: which card to show next.
//!
//! Candidates are tried in a fixed order and the first match wins:
//! - learning/relearning cards that are due
//! - review cards that are due
//! - new cards, oldest first, when new cards are allowed
//! - with pull-ahead on, whatever has the earliest due date
//!
//! Within a bucket cards are ordered by `due_at`, then by card `created_at`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::scope::ScopeFilter;
use crate::config::SchedulerConfig;
use crate::domain::{Card, QueueStatus, SchedulingState};

/// A card paired with its scheduling state.
///
/// Cards that were never graded carry an unpersisted `new` state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledCard {
    pub card: Card,
    pub state: SchedulingState,
}

impl ScheduledCard {
    pub fn new(card: Card, state: SchedulingState) -> Self {
        Self { card, state }
    }

    fn is_buried(&self, buried: &HashSet<String>) -> bool {
        self.card.sibling_key.as_ref().is_some_and(|key| buried.contains(key))
    }
}

/// Picks the next card to study.
pub struct QueueSelector<'a> {
    config: &'a SchedulerConfig,
    pull_ahead: bool,
}

impl<'a> QueueSelector<'a> {
    pub fn new(config: &'a SchedulerConfig) -> Self {
        Self {
            config,
            pull_ahead: false,
        }
    }

    /// Allow studying cards before they are due once nothing else is left.
    pub fn with_pull_ahead(mut self, pull_ahead: bool) -> Self {
        self.pull_ahead = pull_ahead;
        self
    }

    /// Select the next card among `candidates` that pass `scope`.
    ///
    /// `buried` holds sibling keys whose `new` and `review` cards are skipped.
    /// It is ignored unless `bury_siblings` is enabled.
    pub fn select_next<'c>(
        &self,
        candidates: &'c [ScheduledCard],
        now: DateTime<Utc>,
        scope: &ScopeFilter,
        buried: &HashSet<String>,
    ) -> Option<&'c ScheduledCard> {
        let empty = HashSet::new();
        let buried = if self.config.bury_siblings { buried } else { &empty };
        let in_scope: Vec<&ScheduledCard> = candidates.iter().filter(|c| scope.matches(&c.card)).collect();

        let learning = earliest_due(
            in_scope
                .iter()
                .copied()
                .filter(|c| c.state.queue_status.is_learning() && c.state.is_due(now)),
        );
        if let Some(next) = learning {
            log::debug!("Selected learning card {}", next.card.id);
            return Some(next);
        }

        if self.config.review_limit > 0 {
            let review = earliest_due(in_scope.iter().copied().filter(|c| {
                c.state.queue_status == QueueStatus::Review && c.state.is_due(now) && !c.is_buried(buried)
            }));
            if let Some(next) = review {
                log::debug!("Selected review card {}", next.card.id);
                return Some(next);
            }
        }

        if self.config.new_limit > 0 {
            let new_card = in_scope
                .iter()
                .copied()
                .filter(|c| c.state.queue_status == QueueStatus::New && !c.is_buried(buried))
                .min_by(|a, b| a.card.created_at.cmp(&b.card.created_at));
            if let Some(next) = new_card {
                log::debug!("Selected new card {}", next.card.id);
                return Some(next);
            }
        }

        if self.pull_ahead {
            let ahead = earliest_due(in_scope.iter().copied().filter(|c| c.state.due_at.is_some()));
            if let Some(next) = ahead {
                log::debug!("Pulled card {} ahead of its due date", next.card.id);
                return Some(next);
            }
        }

        None
    }
}

fn earliest_due<'c>(cards: impl Iterator<Item = &'c ScheduledCard>) -> Option<&'c ScheduledCard> {
    cards.min_by(|a, b| {
        a.state
            .due_at
            .cmp(&b.state.due_at)
            .then_with(|| a.card.created_at.cmp(&b.card.created_at))
    })
}
