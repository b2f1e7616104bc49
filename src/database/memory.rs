//! In-memory store for embedding the engine without SQLite.

use super::ScheduleStore;
use crate::error::{Error, Result};
use crate::models::{CardId, Flashcard, ReviewEvent, ReviewSchedule};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io;

#[derive(Default)]
pub struct MemoryStore {
    decks: HashMap<String, Vec<CardId>>,
    cards: HashMap<CardId, Flashcard>,
    schedules: HashMap<CardId, ReviewSchedule>,
    events: Vec<ReviewEvent>,
    next_id: CardId,
    failing_writes: usize,
    failing_appends: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a card to a deck (creating the deck if needed) together with its
    /// default schedule, due at `now`.
    pub fn add_card(
        &mut self,
        deck_name: &str,
        front: &str,
        back: &str,
        hint: Option<&str>,
        now: DateTime<Utc>,
    ) -> Flashcard {
        self.next_id += 1;
        let card = Flashcard {
            id: self.next_id,
            front: front.to_string(),
            back: back.to_string(),
            hint: hint.map(str::to_string),
        };

        self.decks
            .entry(deck_name.to_string())
            .or_default()
            .push(card.id);
        self.cards.insert(card.id, card.clone());
        self.schedules
            .insert(card.id, ReviewSchedule::new(card.id, now));
        card
    }

    pub fn remove_card(&mut self, card_id: CardId) {
        self.cards.remove(&card_id);
        self.schedules.remove(&card_id);
        for ids in self.decks.values_mut() {
            ids.retain(|&id| id != card_id);
        }
    }

    pub fn events(&self) -> &[ReviewEvent] {
        &self.events
    }

    /// Fault injection: the next `count` schedule saves fail.
    pub fn fail_next_writes(&mut self, count: usize) {
        self.failing_writes = count;
    }

    /// Fault injection: the next `count` event appends fail.
    pub fn fail_event_appends(&mut self, count: usize) {
        self.failing_appends = count;
    }

    fn injected_failure(what: &str) -> Error {
        Error::Persistence(Box::new(io::Error::other(format!("injected {what} failure"))))
    }
}

impl ScheduleStore for MemoryStore {
    fn load_schedule(&self, card_id: CardId) -> Result<ReviewSchedule> {
        self.schedules
            .get(&card_id)
            .cloned()
            .ok_or(Error::UnknownCard(card_id))
    }

    fn save_schedule(&mut self, schedule: &ReviewSchedule) -> Result<()> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(Self::injected_failure("schedule write"));
        }
        if !self.cards.contains_key(&schedule.card_id) {
            return Err(Error::UnknownCard(schedule.card_id));
        }
        self.schedules.insert(schedule.card_id, schedule.clone());
        Ok(())
    }

    fn append_review_event(&mut self, event: &ReviewEvent) -> Result<()> {
        if self.failing_appends > 0 {
            self.failing_appends -= 1;
            return Err(Self::injected_failure("event append"));
        }
        self.events.push(event.clone());
        Ok(())
    }

    fn deck_schedules(&self, deck_name: &str) -> Result<Vec<ReviewSchedule>> {
        let ids = self
            .decks
            .get(deck_name)
            .ok_or_else(|| Error::UnknownDeck(deck_name.to_string()))?;
        Ok(ids
            .iter()
            .filter_map(|id| self.schedules.get(id).cloned())
            .collect())
    }

    fn load_card(&self, card_id: CardId) -> Result<Flashcard> {
        self.cards
            .get(&card_id)
            .cloned()
            .ok_or(Error::UnknownCard(card_id))
    }
}
