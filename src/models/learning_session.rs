//! Review session management for spaced repetition practice.
//!
//! A session walks a queue of due cards one at a time: the front is shown,
//! `reveal` exposes the back and records the response time, and `rate` runs
//! the SM-2 step and hands the new schedule to storage before moving on.
//! The session only advances once storage has accepted the review.

use super::learning_card::Rating;
use super::sm2::{self, Quality};
use super::{CardId, Flashcard, LearningCard, ReviewEvent, ReviewSchedule};
use crate::clock::{Clock, SystemClock};
use crate::database::ScheduleStore;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Front side of the card currently under review.
#[derive(Clone, Debug, PartialEq)]
pub struct CardPrompt {
    pub card_id: CardId,
    pub front: String,
    /// Zero-based position in the queue.
    pub position: usize,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Revealed {
    pub back: String,
    pub hint: Option<String>,
    pub response_time_ms: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RateOutcome {
    /// The next card, with statistics over the cards rated so far.
    Next { prompt: CardPrompt, stats: SessionStats },
    Completed(SessionStats),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total: usize,
    pub reviewed: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Mean of submitted qualities; 0 when nothing was rated.
    pub average_quality: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum SessionState {
    NotStarted,
    Active {
        card_index: usize,
        card_started_at: DateTime<Utc>,
        response_time_ms: Option<u64>,
    },
    Completed,
    Abandoned,
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::NotStarted => "not started",
            SessionState::Active {
                response_time_ms: None,
                ..
            } => "awaiting reveal",
            SessionState::Active { .. } => "awaiting rating",
            SessionState::Completed => "completed",
            SessionState::Abandoned => "abandoned",
        }
    }
}

/// A review computed for the current card that storage has not yet accepted.
#[derive(Clone, Debug)]
struct PendingReview {
    card_index: usize,
    quality: Quality,
    prior: ReviewSchedule,
    schedule: ReviewSchedule,
    event: ReviewEvent,
}

pub struct ReviewSession<C: Clock = SystemClock> {
    pub deck_title: String,
    cards: Vec<LearningCard>,
    state: SessionState,
    pending: Option<PendingReview>,
    clock: C,
}

impl<C: Clock> ReviewSession<C> {
    /// Creates a session over cards already ordered by the due selector.
    pub fn new(deck_title: impl Into<String>, cards: Vec<Flashcard>, clock: C) -> Self {
        Self {
            deck_title: deck_title.into(),
            cards: cards.into_iter().map(LearningCard::new).collect(),
            state: SessionState::NotStarted,
            pending: None,
            clock,
        }
    }

    /// Shows the first card, or completes immediately when the queue is empty.
    pub fn start(&mut self) -> Result<Option<CardPrompt>> {
        if self.state != SessionState::NotStarted {
            return Err(Error::out_of_order("start", self.state.name()));
        }

        info!(deck = %self.deck_title, cards = self.cards.len(), "review session started");

        if self.cards.is_empty() {
            self.state = SessionState::Completed;
            return Ok(None);
        }

        self.state = SessionState::Active {
            card_index: 0,
            card_started_at: self.clock.now(),
            response_time_ms: None,
        };
        Ok(self.current_prompt())
    }

    pub fn current_prompt(&self) -> Option<CardPrompt> {
        let SessionState::Active { card_index, .. } = self.state else {
            return None;
        };
        let card = &self.cards[card_index].flashcard;
        Some(CardPrompt {
            card_id: card.id,
            front: card.front.clone(),
            position: card_index,
            total: self.cards.len(),
        })
    }

    /// Hint for the current card. Does not affect response timing.
    pub fn hint(&self) -> Result<Option<&str>> {
        match self.state {
            SessionState::Active { card_index, .. } => {
                Ok(self.cards[card_index].flashcard.hint.as_deref())
            }
            state => Err(Error::out_of_order("show hint", state.name())),
        }
    }

    /// Exposes the back of the current card. The first reveal fixes the
    /// response time; revealing again returns the same answer.
    pub fn reveal(&mut self) -> Result<Revealed> {
        let SessionState::Active {
            card_index,
            card_started_at,
            response_time_ms,
        } = self.state
        else {
            return Err(Error::out_of_order("reveal", self.state.name()));
        };

        let elapsed = response_time_ms.unwrap_or_else(|| {
            let millis = (self.clock.now() - card_started_at).num_milliseconds();
            millis.max(0) as u64
        });
        self.state = SessionState::Active {
            card_index,
            card_started_at,
            response_time_ms: Some(elapsed),
        };

        let card = &self.cards[card_index].flashcard;
        Ok(Revealed {
            back: card.back.clone(),
            hint: card.hint.clone(),
            response_time_ms: elapsed,
        })
    }

    /// Rates the revealed card, persists the new schedule and review event,
    /// and moves to the next card.
    ///
    /// On a persistence failure the session stays on the same card and the
    /// computed review is kept, so retrying with the same quality records it
    /// exactly once.
    pub fn rate<S>(&mut self, store: &mut S, quality: u8) -> Result<RateOutcome>
    where
        S: ScheduleStore + ?Sized,
    {
        let quality = Quality::new(quality)?;

        let SessionState::Active {
            card_index,
            response_time_ms: Some(response_time_ms),
            ..
        } = self.state
        else {
            return Err(Error::out_of_order("rate", self.state.name()));
        };

        let card_id = self.cards[card_index].flashcard.id;
        let review = match self.pending.take() {
            Some(pending) if pending.card_index == card_index && pending.quality == quality => {
                debug!(card_id, "retrying pending review");
                pending
            }
            Some(pending) if pending.card_index == card_index => {
                self.build_review(card_index, quality, pending.prior, response_time_ms)
            }
            _ => {
                let prior = store.load_schedule(card_id)?;
                self.build_review(card_index, quality, prior, response_time_ms)
            }
        };

        if let Err(err) = store.record_review(&review.schedule, &review.event) {
            warn!(card_id, error = %err, "review not recorded");
            self.pending = Some(review);
            return Err(err);
        }

        self.cards[card_index].mark_rated(Rating {
            quality,
            response_time_ms,
            reviewed_at: review.event.reviewed_at,
        });

        Ok(self.advance(card_index))
    }

    fn build_review(
        &self,
        card_index: usize,
        quality: Quality,
        prior: ReviewSchedule,
        response_time_ms: u64,
    ) -> PendingReview {
        let now = self.clock.now();
        let schedule = sm2::apply(&prior, quality, now);
        let event = ReviewEvent {
            card_id: prior.card_id,
            quality: quality.value(),
            response_time_ms,
            reviewed_at: now,
        };
        PendingReview {
            card_index,
            quality,
            prior,
            schedule,
            event,
        }
    }

    fn advance(&mut self, card_index: usize) -> RateOutcome {
        if card_index + 1 < self.cards.len() {
            self.state = SessionState::Active {
                card_index: card_index + 1,
                card_started_at: self.clock.now(),
                response_time_ms: None,
            };
            match self.current_prompt() {
                Some(prompt) => RateOutcome::Next {
                    prompt,
                    stats: self.stats(),
                },
                None => RateOutcome::Completed(self.stats()),
            }
        } else {
            self.state = SessionState::Completed;
            let stats = self.stats();
            info!(
                deck = %self.deck_title,
                reviewed = stats.reviewed,
                correct = stats.correct,
                "review session completed"
            );
            RateOutcome::Completed(stats)
        }
    }

    /// Stops the session early. Reviews already recorded stay recorded.
    pub fn abandon(&mut self) -> SessionStats {
        if matches!(self.state, SessionState::NotStarted | SessionState::Active { .. }) {
            self.state = SessionState::Abandoned;
            self.pending = None;
            info!(deck = %self.deck_title, "review session abandoned");
        }
        self.stats()
    }

    /// Statistics over the cards rated so far.
    pub fn stats(&self) -> SessionStats {
        let rated = self.cards.iter().filter(|card| card.is_rated());

        let reviewed = rated.clone().count();
        let correct = self.cards.iter().filter(|card| card.is_learned()).count();
        let sum: u32 = rated
            .filter_map(|card| card.rating)
            .map(|r| r.quality.value() as u32)
            .sum();
        let average_quality = if reviewed == 0 {
            0.0
        } else {
            sum as f64 / reviewed as f64
        };

        SessionStats {
            total: self.cards.len(),
            reviewed,
            correct,
            incorrect: reviewed - correct,
            average_quality,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Completed | SessionState::Abandoned)
    }

    pub fn is_revealed(&self) -> bool {
        matches!(
            self.state,
            SessionState::Active {
                response_time_ms: Some(_),
                ..
            }
        )
    }

    pub fn phase_message(&self) -> String {
        match self.state {
            SessionState::Active { card_index, .. } => format!(
                "{}: card {} of {}",
                self.deck_title,
                card_index + 1,
                self.cards.len()
            ),
            state => format!("{}: {}", self.deck_title, state.name()),
        }
    }
}
