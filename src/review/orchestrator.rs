//! Review orchestrator: the engine plus persistence, undo and leech tagging.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use super::history::{HistoryEntry, UndoHistory};
use super::locks::CardLocks;
use crate::config::SchedulerConfig;
use crate::domain::{Card, Deck, LEECH_TAG, QueueStatus, Rating, ReviewLogEntry, SchedulingState, StateSnapshot};
use crate::engine::{GradeResult, MAX_INTERVAL_DAYS, RatingPreview, apply_rating, is_leech, preview_all};
use crate::error::{Result, ReviewrError};
use crate::id::generate_review_id;
use crate::scheduler::{
    DayActivity, MAX_ACTIVITY_DAYS, QueueSelector, ScheduledCard, Scope, ScopeFilter, TodaySummary, daily_activity,
    study_day_start,
};
use crate::storage::{CardStore, DeckStore, ReviewLogStore, StateStore, Storage};

/// What an undo put back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UndoOutcome {
    pub card: Card,
    pub state: SchedulingState,
    /// Rating of the grade that was reverted
    pub rating: Rating,
}

/// Coordinates grading, previews, undo and queue selection over a storage backend.
pub struct ReviewOrchestrator<S: Storage> {
    storage: S,
    config: SchedulerConfig,
    locks: CardLocks,
}

impl<S: Storage> ReviewOrchestrator<S> {
    /// Create an orchestrator. Fails with `Config` if `config` is invalid.
    pub fn new(storage: S, config: SchedulerConfig) -> Result<Self> {
        let config = config.validated()?;
        Ok(Self {
            storage,
            config,
            locks: CardLocks::new(),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn cards(&self) -> CardStore<'_, S> {
        CardStore::new(&self.storage)
    }

    fn decks(&self) -> DeckStore<'_, S> {
        DeckStore::new(&self.storage)
    }

    fn states(&self) -> StateStore<'_, S> {
        StateStore::new(&self.storage)
    }

    fn reviews(&self) -> ReviewLogStore<'_, S> {
        ReviewLogStore::new(&self.storage)
    }

    /// Create a deck, checking that its parent exists.
    pub fn add_deck(&self, deck: &Deck) -> Result<()> {
        if let Some(parent_id) = &deck.parent_id {
            self.decks().require(parent_id)?;
        }
        self.decks().create(deck)?;
        log::info!("Added deck {} ({})", deck.name, deck.id);
        Ok(())
    }

    /// Create a card in an existing deck.
    pub fn add_card(&self, card: &Card) -> Result<()> {
        self.decks().require(&card.deck_id)?;
        self.cards().create(card)?;
        log::info!("Added card {} to deck {}", card.id, card.deck_id);
        Ok(())
    }

    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        self.decks().list_all()
    }

    /// Cards in `scope`, each with its state (unpersisted `new` if never graded).
    pub fn scheduled_cards(&self, scope: &Scope) -> Result<Vec<ScheduledCard>> {
        let (cards, filter) = self.load_scope(scope)?;
        Ok(cards.into_iter().filter(|c| filter.matches(&c.card)).collect())
    }

    /// Delete a card together with its scheduling state and review log.
    pub fn delete_card(&self, card_id: &str) -> Result<()> {
        self.locks.with_lock(card_id, || {
            self.cards().delete(card_id)?;
            self.states().delete(card_id)?;
            let removed = self.reviews().delete_for_card(card_id)?;
            log::info!("Deleted card {} and {} review log entries", card_id, removed);
            Ok(())
        })?;
        self.locks.forget(card_id)
    }

    /// Grade a card and persist the result.
    ///
    /// The state write is checked against the version that was read; on a
    /// conflict the grade is re-read and re-applied once. If the tag or log
    /// write fails afterwards, the state is put back.
    pub fn grade(&self, card_id: &str, rating: Rating, now: DateTime<Utc>) -> Result<(GradeResult, ReviewLogEntry)> {
        self.locks.with_lock(card_id, || {
            retry_on_conflict("grade", card_id, || self.grade_locked(card_id, rating, now))
        })
    }

    fn grade_locked(&self, card_id: &str, rating: Rating, now: DateTime<Utc>) -> Result<(GradeResult, ReviewLogEntry)> {
        let mut card = self.cards().require(card_id)?;
        let state = self.states().get_or_create(card_id, &self.config)?;

        let mut result = apply_rating(&state, rating, now, &self.config);
        let tags_before = card.tags.clone();
        if is_leech(&result.state_after, &self.config) && card.add_tag(LEECH_TAG) {
            result.became_leech = true;
            log::info!("Card {} became a leech after {} lapses", card_id, result.state_after.lapses);
        }

        let saved = self.states().save_checked(&result.state_after)?;

        let entry = ReviewLogEntry {
            id: generate_review_id(),
            card_id: card_id.to_string(),
            rating,
            reviewed_at: now,
            elapsed_days: result.elapsed_days,
            interval_before: result.interval_before,
            interval_after: result.interval_after,
            ease_before: result.ease_before,
            ease_after: result.ease_after,
            state_before: state.snapshot(),
            tags_before,
        };
        if let Err(e) = self.record_grade(&card, result.became_leech, &entry) {
            self.roll_back_state(&saved, &entry.state_before);
            return Err(e);
        }
        result.state_after = saved;

        log::info!(
            "Graded card {} {}: {} -> {}, interval {}d -> {}d",
            card_id,
            rating,
            state.queue_status,
            result.state_after.queue_status,
            result.interval_before,
            result.interval_after
        );
        Ok((result, entry))
    }

    /// Write the leech tag (if any) and the log row of a grade whose state is saved.
    ///
    /// A tag written before a failed log append is taken back off.
    fn record_grade(&self, card: &Card, tags_changed: bool, entry: &ReviewLogEntry) -> Result<()> {
        if tags_changed {
            self.cards().update(card)?;
        }
        if let Err(e) = self.reviews().append(entry) {
            if tags_changed {
                let mut untagged = card.clone();
                untagged.tags = entry.tags_before.clone();
                if let Err(undo_err) = self.cards().update(&untagged) {
                    log::error!("Failed to restore tags of card {}: {}", card.id, undo_err);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Put a saved state back to `before` after the rest of its grade failed.
    fn roll_back_state(&self, saved: &SchedulingState, before: &StateSnapshot) {
        let mut state = saved.clone();
        state.restore(before);
        match self.states().save_checked(&state) {
            Ok(_) => log::warn!("Rolled back grade of card {}", saved.card_id),
            Err(e) => log::error!("Failed to roll back state of card {}: {}", saved.card_id, e),
        }
    }

    /// Due dates for every rating, without persisting anything.
    pub fn preview_all_ratings(&self, card_id: &str, now: DateTime<Utc>) -> Result<Vec<RatingPreview>> {
        self.cards().require(card_id)?;
        let state = self
            .states()
            .get(card_id)?
            .unwrap_or_else(|| SchedulingState::new(card_id, &self.config));
        Ok(preview_all(&state, now, &self.config))
    }

    /// Revert the most recent grade recorded in `scope`.
    ///
    /// Restores the state snapshot and tag list and deletes the review log
    /// entry. Returns `None` when there is nothing to undo. If the undo fails,
    /// the entry stays in the history.
    pub fn undo_last(&self, history: &mut UndoHistory, scope: &Scope) -> Result<Option<UndoOutcome>> {
        history.ensure_scope(scope);
        let Some(entry) = history.pop_matching(scope) else {
            return Ok(None);
        };

        match self.undo_entry(&entry) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                if !matches!(e, ReviewrError::CardNotFound(_)) {
                    history.restore_entry(entry);
                }
                Err(e)
            }
        }
    }

    fn undo_entry(&self, entry: &HistoryEntry) -> Result<UndoOutcome> {
        let card_id = entry.card_id.as_str();
        self.locks.with_lock(card_id, || {
            retry_on_conflict("undo", card_id, || {
                let mut card = self.cards().require(card_id)?;
                let mut state = self.states().get_or_create(card_id, &self.config)?;
                state.restore(&entry.state_before);
                let state = self.states().save_checked(&state)?;

                if card.tags != entry.tags_before {
                    card.tags = entry.tags_before.clone();
                    self.cards().update(&card)?;
                }
                if !self.reviews().delete(&entry.review_id)? {
                    log::warn!("Review log entry {} was already gone", entry.review_id);
                }

                log::info!("Undid {} on card {}", entry.rating, card_id);
                Ok(UndoOutcome {
                    card,
                    state,
                    rating: entry.rating,
                })
            })
        })
    }

    /// Next card to study in `scope`, or `None` when nothing is due.
    pub fn next_card(&self, scope: &Scope, now: DateTime<Utc>) -> Result<Option<ScheduledCard>> {
        self.select_next(scope, now, false)
    }

    /// Like `next_card`, but falls back to the card due soonest.
    pub fn next_card_ahead(&self, scope: &Scope, now: DateTime<Utc>) -> Result<Option<ScheduledCard>> {
        self.select_next(scope, now, true)
    }

    fn select_next(&self, scope: &Scope, now: DateTime<Utc>, pull_ahead: bool) -> Result<Option<ScheduledCard>> {
        let (cards, filter) = self.load_scope(scope)?;
        let buried = if self.config.bury_siblings {
            self.buried_siblings(now, &cards)?
        } else {
            HashSet::new()
        };

        Ok(QueueSelector::new(&self.config)
            .with_pull_ahead(pull_ahead)
            .select_next(&cards, now, &filter, &buried)
            .cloned())
    }

    /// Sibling keys of cards reviewed since the start of the current study day.
    fn buried_siblings(&self, now: DateTime<Utc>, cards: &[ScheduledCard]) -> Result<HashSet<String>> {
        let start = study_day_start(now, self.config.day_cutoff_hour);
        let reviewed: HashSet<String> = self
            .reviews()
            .list_between(start, start + Duration::days(1))?
            .into_iter()
            .map(|e| e.card_id)
            .collect();

        Ok(cards
            .iter()
            .filter(|c| reviewed.contains(&c.card.id))
            .filter_map(|c| c.card.sibling_key.clone())
            .collect())
    }

    /// New, review-due and total due counts in `scope`.
    pub fn today_summary(&self, scope: &Scope, now: DateTime<Utc>) -> Result<TodaySummary> {
        let (cards, filter) = self.load_scope(scope)?;
        Ok(TodaySummary::compute(&cards, now, &filter))
    }

    /// Reviews logged and cards due for each study day in `from..=to`.
    ///
    /// Fails with `InvalidRange` if `to` is before `from` or the span is longer
    /// than `MAX_ACTIVITY_DAYS`.
    pub fn daily_activity(&self, from: NaiveDate, to: NaiveDate, now: DateTime<Utc>) -> Result<Vec<DayActivity>> {
        let span = (to - from).num_days();
        if span < 0 || span >= i64::from(MAX_ACTIVITY_DAYS) {
            return Err(ReviewrError::InvalidRange(format!(
                "{} to {} (at most {} days)",
                from, to, MAX_ACTIVITY_DAYS
            )));
        }
        let cutoff = self.config.day_cutoff_hour;
        let start = study_day_start(from.and_hms_opt(cutoff, 0, 0).map(|n| n.and_utc()).unwrap_or(now), cutoff);
        let end = to
            .succ_opt()
            .and_then(|d| d.and_hms_opt(cutoff, 0, 0))
            .map(|n| n.and_utc())
            .unwrap_or(now);

        let logs = self.reviews().list_between(start, end)?;
        let (cards, _) = self.load_scope(&Scope::All)?;
        Ok(daily_activity(from, to, now, cutoff, &logs, &cards))
    }

    /// Push a card out by `days` days into the review queue.
    pub fn defer(&self, card_id: &str, days: u32, now: DateTime<Utc>) -> Result<SchedulingState> {
        self.locks.with_lock(card_id, || {
            retry_on_conflict("defer", card_id, || {
                self.cards().require(card_id)?;
                let mut state = self.states().get_or_create(card_id, &self.config)?;
                let days = days.min(MAX_INTERVAL_DAYS);
                state.due_at = Some(now + Duration::days(i64::from(days)));
                state.queue_status = QueueStatus::Review;
                state.interval_days = state.interval_days.max(1);
                state.learning_step_index = 0;
                let state = self.states().save_checked(&state)?;
                log::info!("Deferred card {} by {} days", card_id, days);
                Ok(state)
            })
        })
    }

    /// All cards paired with their states, plus the resolved scope filter.
    fn load_scope(&self, scope: &Scope) -> Result<(Vec<ScheduledCard>, ScopeFilter)> {
        let decks = self.decks().list_all()?;
        if let Scope::Deck(id) = scope
            && !decks.iter().any(|d| &d.id == id)
        {
            return Err(ReviewrError::DeckNotFound(id.clone()));
        }
        let filter = scope.resolve(&decks);

        let mut states: HashMap<String, SchedulingState> = self
            .states()
            .list_all()?
            .into_iter()
            .map(|s| (s.card_id.clone(), s))
            .collect();

        let cards = self
            .cards()
            .list_all()?
            .into_iter()
            .map(|card| {
                let state = states
                    .remove(&card.id)
                    .unwrap_or_else(|| SchedulingState::new(&card.id, &self.config));
                ScheduledCard::new(card, state)
            })
            .collect();
        Ok((cards, filter))
    }
}

/// Run `op`, running it a second time if the first attempt hit a write conflict.
fn retry_on_conflict<T>(what: &str, card_id: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    match op() {
        Err(e) if e.is_retryable() => {
            log::warn!("Retrying {} of card {} after conflict: {}", what, card_id, e);
            op()
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Filter, HasId, JsonlStorage, REVIEWS_COLLECTION, SqliteStorage};
    use chrono::TimeZone;
    use serde::de::DeserializeOwned;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Storage that can refuse creates in one collection or report write conflicts.
    struct FlakyStorage {
        inner: SqliteStorage,
        read_only: Mutex<Option<&'static str>>,
        pending_conflicts: AtomicUsize,
    }

    impl FlakyStorage {
        fn new() -> Self {
            Self {
                inner: SqliteStorage::in_memory().unwrap(),
                read_only: Mutex::new(None),
                pending_conflicts: AtomicUsize::new(0),
            }
        }

        fn refuse_creates_in(&self, collection: &'static str) {
            *self.read_only.lock().unwrap() = Some(collection);
        }

        fn conflict_next(&self, times: usize) {
            self.pending_conflicts.store(times, Ordering::SeqCst);
        }
    }

    impl Storage for FlakyStorage {
        fn create<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, record: &T) -> Result<()> {
            if *self.read_only.lock().unwrap() == Some(collection) {
                return Err(ReviewrError::Storage(format!("{} is read-only", collection)));
            }
            self.inner.create(collection, record)
        }

        fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
            self.inner.get(collection, id)
        }

        fn update<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, id: &str, record: &T) -> Result<()> {
            self.inner.update(collection, id, record)
        }

        fn compare_and_update<T: Serialize + DeserializeOwned + HasId>(
            &self,
            collection: &str,
            id: &str,
            expected_version: u64,
            record: &T,
        ) -> Result<()> {
            let injected = self
                .pending_conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if injected {
                return Err(ReviewrError::Conflict(format!("{}/{} changed underneath", collection, id)));
            }
            self.inner.compare_and_update(collection, id, expected_version, record)
        }

        fn delete(&self, collection: &str, id: &str) -> Result<()> {
            self.inner.delete(collection, id)
        }

        fn delete_where(&self, collection: &str, filters: &[Filter]) -> Result<usize> {
            self.inner.delete_where(collection, filters)
        }

        fn query<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>> {
            self.inner.query(collection, filters)
        }

        fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
            self.inner.list(collection)
        }
    }

    fn flaky_setup() -> (ReviewOrchestrator<FlakyStorage>, Card) {
        let orchestrator = ReviewOrchestrator::new(FlakyStorage::new(), SchedulerConfig::default()).unwrap();
        let deck = Deck::new("Spanish", t0());
        orchestrator.add_deck(&deck).unwrap();
        let card = Card::new(&deck.id, t0());
        orchestrator.add_card(&card).unwrap();
        (orchestrator, card)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn setup() -> (ReviewOrchestrator<SqliteStorage>, Deck) {
        let orchestrator =
            ReviewOrchestrator::new(SqliteStorage::in_memory().unwrap(), SchedulerConfig::default()).unwrap();
        let deck = Deck::new("Spanish", t0());
        orchestrator.add_deck(&deck).unwrap();
        (orchestrator, deck)
    }

    fn add_card(orchestrator: &ReviewOrchestrator<SqliteStorage>, deck: &Deck, created_offset_min: i64) -> Card {
        let card = Card::new(&deck.id, t0() + Duration::minutes(created_offset_min));
        orchestrator.add_card(&card).unwrap();
        card
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SchedulerConfig {
            learning_steps_minutes: vec![],
            ..SchedulerConfig::default()
        };
        let result = ReviewOrchestrator::new(SqliteStorage::in_memory().unwrap(), config);
        assert!(matches!(result, Err(ReviewrError::Config(_))));
    }

    #[test]
    fn test_add_card_requires_deck() {
        let (orchestrator, _deck) = setup();
        let card = Card::new("no-such-deck", t0());
        assert!(matches!(orchestrator.add_card(&card), Err(ReviewrError::DeckNotFound(_))));

        let orphan = Deck::new("Orphan", t0()).with_parent("missing");
        assert!(matches!(orchestrator.add_deck(&orphan), Err(ReviewrError::DeckNotFound(_))));
    }

    #[test]
    fn test_grade_unknown_card() {
        let (orchestrator, _deck) = setup();
        let err = orchestrator.grade("nope", Rating::Good, t0()).unwrap_err();
        assert!(matches!(err, ReviewrError::CardNotFound(_)));
        assert!(orchestrator.states().list_all().unwrap().is_empty());
    }

    #[test]
    fn test_grade_persists_state_and_log() {
        let (orchestrator, deck) = setup();
        let card = add_card(&orchestrator, &deck, 0);

        let (result, entry) = orchestrator.grade(&card.id, Rating::Easy, t0()).unwrap();
        assert_eq!(result.state_after.queue_status, QueueStatus::Review);
        assert_eq!(result.state_after.interval_days, 4);
        assert_eq!(result.state_after.version, 1);

        let stored = orchestrator.states().require(&card.id).unwrap();
        assert_eq!(stored, result.state_after);
        assert_eq!(orchestrator.reviews().get(&entry.id).unwrap(), Some(entry.clone()));
        assert_eq!(entry.state_before.queue_status, QueueStatus::New);
    }

    #[test]
    fn test_leech_tag_added_once() {
        let (orchestrator, deck) = setup();
        let card = add_card(&orchestrator, &deck, 0);

        let mut state = orchestrator.states().get_or_create(&card.id, orchestrator.config()).unwrap();
        state.queue_status = QueueStatus::Review;
        state.interval_days = 10;
        state.lapses = 7;
        state.due_at = Some(t0());
        orchestrator.states().save_checked(&state).unwrap();

        let (result, entry) = orchestrator.grade(&card.id, Rating::Again, t0()).unwrap();
        assert!(result.became_leech);
        assert_eq!(result.state_after.lapses, 8);
        assert!(entry.tags_before.is_empty());
        assert!(orchestrator.cards().require(&card.id).unwrap().is_leech());

        // Already tagged: no second report
        let (result, _) = orchestrator
            .grade(&card.id, Rating::Again, t0() + Duration::minutes(10))
            .unwrap();
        assert!(!result.became_leech);
        let tags = orchestrator.cards().require(&card.id).unwrap().tags;
        assert_eq!(tags, vec![LEECH_TAG.to_string()]);
    }

    #[test]
    fn test_failed_log_write_rolls_back_state() {
        let (orchestrator, card) = flaky_setup();
        orchestrator.storage().refuse_creates_in(REVIEWS_COLLECTION);

        let err = orchestrator.grade(&card.id, Rating::Good, t0()).unwrap_err();
        assert!(matches!(err, ReviewrError::Storage(_)));

        let state = orchestrator.states().require(&card.id).unwrap();
        let fresh = SchedulingState::new(&card.id, orchestrator.config());
        assert_eq!(state.snapshot(), fresh.snapshot());
        assert!(orchestrator.reviews().list_for_card(&card.id).unwrap().is_empty());
    }

    #[test]
    fn test_failed_log_write_removes_leech_tag() {
        let (orchestrator, card) = flaky_setup();
        let mut state = orchestrator.states().get_or_create(&card.id, orchestrator.config()).unwrap();
        state.queue_status = QueueStatus::Review;
        state.interval_days = 10;
        state.lapses = 7;
        state.due_at = Some(t0());
        let before = orchestrator.states().save_checked(&state).unwrap();
        orchestrator.storage().refuse_creates_in(REVIEWS_COLLECTION);

        assert!(orchestrator.grade(&card.id, Rating::Again, t0()).is_err());

        let after = orchestrator.states().require(&card.id).unwrap();
        assert_eq!(after.snapshot(), before.snapshot());
        assert_eq!(after.lapses, 7);
        assert!(!orchestrator.cards().require(&card.id).unwrap().is_leech());
        assert!(orchestrator.reviews().list_for_card(&card.id).unwrap().is_empty());
    }

    #[test]
    fn test_grade_retried_once_after_conflict() {
        let (orchestrator, card) = flaky_setup();
        orchestrator.states().get_or_create(&card.id, orchestrator.config()).unwrap();
        orchestrator.storage().conflict_next(1);

        let (result, _) = orchestrator.grade(&card.id, Rating::Good, t0()).unwrap();
        assert_eq!(result.state_after.reps, 1);
        assert_eq!(result.state_after.version, 1);
        assert_eq!(orchestrator.reviews().list_for_card(&card.id).unwrap().len(), 1);
    }

    #[test]
    fn test_second_conflict_is_reported() {
        let (orchestrator, card) = flaky_setup();
        orchestrator.states().get_or_create(&card.id, orchestrator.config()).unwrap();
        orchestrator.storage().conflict_next(2);

        let err = orchestrator.grade(&card.id, Rating::Good, t0()).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(orchestrator.states().require(&card.id).unwrap().version, 0);
        assert!(orchestrator.reviews().list_for_card(&card.id).unwrap().is_empty());
    }

    #[test]
    fn test_preview_does_not_persist() {
        let (orchestrator, deck) = setup();
        let card = add_card(&orchestrator, &deck, 0);

        let previews = orchestrator.preview_all_ratings(&card.id, t0()).unwrap();
        assert_eq!(previews.len(), 4);
        assert!(orchestrator.states().get(&card.id).unwrap().is_none());

        assert!(matches!(
            orchestrator.preview_all_ratings("nope", t0()),
            Err(ReviewrError::CardNotFound(_))
        ));
    }

    #[test]
    fn test_undo_restores_everything() {
        let (orchestrator, deck) = setup();
        let card = add_card(&orchestrator, &deck, 0);
        let scope = Scope::All;
        let mut history = UndoHistory::new();

        orchestrator.grade(&card.id, Rating::Good, t0()).unwrap();
        let before = orchestrator.states().require(&card.id).unwrap();

        let (_, entry) = orchestrator
            .grade(&card.id, Rating::Good, t0() + Duration::minutes(1))
            .unwrap();
        history.ensure_scope(&scope);
        history.push(HistoryEntry::from_review(&entry, &scope));

        let outcome = orchestrator.undo_last(&mut history, &scope).unwrap().unwrap();
        assert_eq!(outcome.rating, Rating::Good);
        assert_eq!(outcome.state.snapshot(), before.snapshot());
        assert!(orchestrator.reviews().get(&entry.id).unwrap().is_none());
        assert!(history.is_empty());

        assert!(orchestrator.undo_last(&mut history, &scope).unwrap().is_none());
    }

    #[test]
    fn test_undo_of_deleted_card() {
        let (orchestrator, deck) = setup();
        let card = add_card(&orchestrator, &deck, 0);
        let mut history = UndoHistory::new();

        let (_, entry) = orchestrator.grade(&card.id, Rating::Good, t0()).unwrap();
        history.push(HistoryEntry::from_review(&entry, &Scope::All));
        orchestrator.delete_card(&card.id).unwrap();

        let err = orchestrator.undo_last(&mut history, &Scope::All).unwrap_err();
        assert!(matches!(err, ReviewrError::CardNotFound(_)));
        assert!(history.is_empty());
    }

    #[test]
    fn test_delete_card_cascades() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator =
            ReviewOrchestrator::new(JsonlStorage::new(temp_dir.path()).unwrap(), SchedulerConfig::default()).unwrap();
        let deck = Deck::new("Spanish", t0());
        orchestrator.add_deck(&deck).unwrap();
        let card = Card::new(&deck.id, t0());
        orchestrator.add_card(&card).unwrap();
        orchestrator.grade(&card.id, Rating::Good, t0()).unwrap();

        orchestrator.delete_card(&card.id).unwrap();
        assert!(orchestrator.cards().get(&card.id).unwrap().is_none());
        assert!(orchestrator.states().get(&card.id).unwrap().is_none());
        assert!(orchestrator.reviews().list_for_card(&card.id).unwrap().is_empty());
    }

    #[test]
    fn test_next_card_and_summary() {
        let (orchestrator, deck) = setup();
        let first = add_card(&orchestrator, &deck, 0);
        let second = add_card(&orchestrator, &deck, 1);

        let next = orchestrator.next_card(&Scope::All, t0()).unwrap().unwrap();
        assert_eq!(next.card.id, first.id);

        orchestrator.grade(&first.id, Rating::Again, t0()).unwrap();
        // first is learning but not due for a minute; second is the oldest new card
        let next = orchestrator.next_card(&Scope::All, t0()).unwrap().unwrap();
        assert_eq!(next.card.id, second.id);

        let later = t0() + Duration::minutes(2);
        let next = orchestrator.next_card(&Scope::All, later).unwrap().unwrap();
        assert_eq!(next.card.id, first.id);

        let summary = orchestrator.today_summary(&Scope::All, later).unwrap();
        assert_eq!(summary.new_count, 1);
        assert_eq!(summary.due_count, 1);
        assert_eq!(summary.review_count, 0);
    }

    #[test]
    fn test_unknown_deck_scope() {
        let (orchestrator, _deck) = setup();
        let err = orchestrator
            .next_card(&Scope::Deck("missing".to_string()), t0())
            .unwrap_err();
        assert!(matches!(err, ReviewrError::DeckNotFound(_)));
    }

    #[test]
    fn test_siblings_buried_after_review() {
        let (orchestrator, deck) = setup();
        let front = Card::new(&deck.id, t0()).with_sibling_key("note-1");
        let back = Card::new(&deck.id, t0() + Duration::minutes(1)).with_sibling_key("note-1");
        let other = Card::new(&deck.id, t0() + Duration::minutes(2));
        for card in [&front, &back, &other] {
            orchestrator.add_card(card).unwrap();
        }

        orchestrator.grade(&front.id, Rating::Easy, t0()).unwrap();
        let next = orchestrator.next_card(&Scope::All, t0()).unwrap().unwrap();
        assert_eq!(next.card.id, other.id);
    }

    #[test]
    fn test_pull_ahead() {
        let (orchestrator, deck) = setup();
        let card = add_card(&orchestrator, &deck, 0);
        orchestrator.grade(&card.id, Rating::Easy, t0()).unwrap();

        assert!(orchestrator.next_card(&Scope::All, t0()).unwrap().is_none());
        let ahead = orchestrator.next_card_ahead(&Scope::All, t0()).unwrap().unwrap();
        assert_eq!(ahead.card.id, card.id);
    }

    #[test]
    fn test_defer() {
        let (orchestrator, deck) = setup();
        let card = add_card(&orchestrator, &deck, 0);

        let state = orchestrator.defer(&card.id, 3, t0()).unwrap();
        assert_eq!(state.queue_status, QueueStatus::Review);
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.due_at, Some(t0() + Duration::days(3)));

        assert!(matches!(
            orchestrator.defer("nope", 3, t0()),
            Err(ReviewrError::CardNotFound(_))
        ));
    }

    #[test]
    fn test_daily_activity() {
        let (orchestrator, deck) = setup();
        let card = add_card(&orchestrator, &deck, 0);
        orchestrator.grade(&card.id, Rating::Easy, t0()).unwrap();

        let day = t0().date_naive();
        let activity = orchestrator
            .daily_activity(day, day + Duration::days(4), t0())
            .unwrap();
        assert_eq!(activity.len(), 5);
        assert_eq!(activity[0].reviews, 1);
        assert_eq!(activity[4].due, 1);
    }

    #[test]
    fn test_daily_activity_rejects_bad_ranges() {
        let (orchestrator, _deck) = setup();
        let day = t0().date_naive();

        let reversed = orchestrator.daily_activity(day, day - Duration::days(1), t0());
        assert!(matches!(reversed, Err(ReviewrError::InvalidRange(_))));

        let too_long = orchestrator.daily_activity(day, day + Duration::days(i64::from(MAX_ACTIVITY_DAYS)), t0());
        assert!(matches!(too_long, Err(ReviewrError::InvalidRange(_))));

        let longest = orchestrator
            .daily_activity(day, day + Duration::days(i64::from(MAX_ACTIVITY_DAYS) - 1), t0())
            .unwrap();
        assert_eq!(longest.len(), MAX_ACTIVITY_DAYS as usize);
    }
}
