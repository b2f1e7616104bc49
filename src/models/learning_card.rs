//! Wrapper for flashcards that tracks progress within a review session.
use super::Flashcard;
use super::sm2::Quality;
use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rating {
    pub quality: Quality,
    pub response_time_ms: u64,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct LearningCard {
    pub flashcard: Flashcard,
    pub rating: Option<Rating>,
}

impl LearningCard {
    pub fn new(flashcard: Flashcard) -> Self {
        Self {
            flashcard,
            rating: None,
        }
    }

    pub fn mark_rated(&mut self, rating: Rating) {
        self.rating = Some(rating);
    }

    pub fn is_rated(&self) -> bool {
        self.rating.is_some()
    }

    /// Rated 3 or above in this session.
    pub fn is_learned(&self) -> bool {
        self.rating.is_some_and(|r| r.quality.is_success())
    }
}
