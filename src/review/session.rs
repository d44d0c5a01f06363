//! A single user's study session.

use chrono::{DateTime, Utc};

use super::history::{HistoryEntry, UndoHistory};
use super::orchestrator::{ReviewOrchestrator, UndoOutcome};
use crate::domain::{Rating, ReviewLogEntry};
use crate::engine::GradeResult;
use crate::error::Result;
use crate::scheduler::{ScheduledCard, Scope, TodaySummary};
use crate::storage::Storage;

/// Study session of one user in one scope, carrying its undo history.
pub struct ReviewSession<'a, S: Storage> {
    orchestrator: &'a ReviewOrchestrator<S>,
    user_id: String,
    scope: Scope,
    history: UndoHistory,
}

impl<'a, S: Storage> ReviewSession<'a, S> {
    /// Start a session with an empty history.
    pub fn new(orchestrator: &'a ReviewOrchestrator<S>, user_id: impl Into<String>, scope: Scope) -> Self {
        Self::resume(orchestrator, user_id, scope, UndoHistory::new())
    }

    /// Continue with a saved history. It is discarded if it belongs to another scope.
    pub fn resume(
        orchestrator: &'a ReviewOrchestrator<S>,
        user_id: impl Into<String>,
        scope: Scope,
        mut history: UndoHistory,
    ) -> Self {
        history.ensure_scope(&scope);
        Self {
            orchestrator,
            user_id: user_id.into(),
            scope,
            history,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Switch scope; the undo history starts over.
    pub fn set_scope(&mut self, scope: Scope) {
        self.history.ensure_scope(&scope);
        self.scope = scope;
    }

    pub fn next_card(&self, now: DateTime<Utc>) -> Result<Option<ScheduledCard>> {
        self.orchestrator.next_card(&self.scope, now)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> Result<TodaySummary> {
        self.orchestrator.today_summary(&self.scope, now)
    }

    /// Grade a card and remember how to undo it.
    pub fn grade(&mut self, card_id: &str, rating: Rating, now: DateTime<Utc>) -> Result<(GradeResult, ReviewLogEntry)> {
        let (result, entry) = self.orchestrator.grade(card_id, rating, now)?;
        self.history.push(HistoryEntry::from_review(&entry, &self.scope));
        Ok((result, entry))
    }

    /// Undo the most recent grade of this session.
    pub fn undo(&mut self) -> Result<Option<UndoOutcome>> {
        self.orchestrator.undo_last(&mut self.history, &self.scope)
    }

    /// End the session, handing back the history for storage.
    pub fn into_history(self) -> UndoHistory {
        self.history
    }
}
