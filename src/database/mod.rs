//! Storage collaborators for review schedules, cards and review events.

pub mod db;
pub mod memory;

use crate::error::Result;
use crate::models::{CardId, Flashcard, ReviewEvent, ReviewSchedule};

pub use db::SqliteStore;
pub use memory::MemoryStore;

/// Persistence used by the engine.
///
/// Writes for the same card must not interleave: an implementation shared
/// between callers has to serialize `record_review` per card.
pub trait ScheduleStore {
    fn load_schedule(&self, card_id: CardId) -> Result<ReviewSchedule>;

    fn save_schedule(&mut self, schedule: &ReviewSchedule) -> Result<()>;

    fn append_review_event(&mut self, event: &ReviewEvent) -> Result<()>;

    /// Persists one review. Saving the same schedule again is harmless, so a
    /// failed call may be retried with the same arguments.
    fn record_review(&mut self, schedule: &ReviewSchedule, event: &ReviewEvent) -> Result<()> {
        self.save_schedule(schedule)?;
        self.append_review_event(event)
    }

    fn deck_schedules(&self, deck_name: &str) -> Result<Vec<ReviewSchedule>>;

    fn load_card(&self, card_id: CardId) -> Result<Flashcard>;
}
