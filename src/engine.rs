//! Entry points used by the surrounding application.
//!
//! The engine performs no authorization: callers pass a deck the learner may study.

use crate::clock::{Clock, SystemClock};
use crate::database::ScheduleStore;
use crate::error::Result;
use crate::models::{
    CardId, DeckStats, MasteryPolicy, RateOutcome, ReviewSchedule, ReviewSession, due, stats,
};
use tracing::debug;

pub struct ReviewEngine<S, C = SystemClock> {
    store: S,
    clock: C,
    mastery: MasteryPolicy,
}

impl<S: ScheduleStore> ReviewEngine<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: ScheduleStore, C: Clock + Clone> ReviewEngine<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            mastery: MasteryPolicy::default(),
        }
    }

    pub fn with_mastery(mut self, mastery: MasteryPolicy) -> Self {
        self.mastery = mastery;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Default schedule for a newly created card; due immediately.
    pub fn create_schedule(&self, card_id: CardId) -> ReviewSchedule {
        ReviewSchedule::new(card_id, self.clock.now())
    }

    pub fn due_queue(&self, deck_name: &str, limit: usize) -> Result<Vec<CardId>> {
        let schedules = self.store.deck_schedules(deck_name)?;
        let queue = due::select_due(&schedules, self.clock.now(), limit);
        debug!(deck = deck_name, due = queue.len(), limit, "selected due cards");
        Ok(queue)
    }

    /// Starts a session over `queue`. An empty queue yields a completed session.
    pub fn start_session(&self, deck_title: &str, queue: &[CardId]) -> Result<ReviewSession<C>> {
        let cards = queue
            .iter()
            .map(|&id| self.store.load_card(id))
            .collect::<Result<Vec<_>>>()?;

        let mut session = ReviewSession::new(deck_title, cards, self.clock.clone());
        session.start()?;
        Ok(session)
    }

    pub fn rate(&mut self, session: &mut ReviewSession<C>, quality: u8) -> Result<RateOutcome> {
        session.rate(&mut self.store, quality)
    }

    pub fn deck_stats(&self, deck_name: &str) -> Result<DeckStats> {
        let schedules = self.store.deck_schedules(deck_name)?;
        Ok(stats::aggregate(&schedules, self.clock.now(), &self.mastery))
    }
}
