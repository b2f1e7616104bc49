pub mod clock;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod export;
pub mod models;

pub use clock::{Clock, ManualClock, OffsetClock, SystemClock};
pub use config::EngineConfig;
pub use database::{MemoryStore, ScheduleStore, SqliteStore};
pub use engine::ReviewEngine;
pub use error::{Error, Result};
pub use models::{
    CardId, Deck, DeckStats, Flashcard, MasteryPolicy, Quality, RateOutcome, ReviewEvent,
    ReviewSchedule, ReviewSession, SessionStats,
};
