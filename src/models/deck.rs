//! Deck is a named set of flashcards
use super::Flashcard;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    pub flashcards: Vec<Flashcard>,
}

