pub mod deck;
pub mod due;
pub mod flashcard;
pub mod learning_card;
pub mod learning_session;
pub mod review_event;
pub mod review_schedule;
pub mod sm2;
pub mod stats;

pub use deck::Deck;
pub use due::select_due;
pub use flashcard::{CardId, Flashcard};
pub use learning_card::{LearningCard, Rating};
pub use learning_session::{CardPrompt, RateOutcome, Revealed, ReviewSession, SessionStats};
pub use review_event::ReviewEvent;
pub use review_schedule::ReviewSchedule;
pub use sm2::Quality;
pub use stats::{DeckStats, MasteryPolicy};
