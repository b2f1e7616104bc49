//! Deck-level counts derived from scheduling state.

use super::ReviewSchedule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thresholds for treating a card as mastered. A card that meets both
/// thresholds stays mastered as either value grows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteryPolicy {
    pub min_repetitions: u32,
    pub min_interval_days: u32,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            min_repetitions: 2,
            min_interval_days: 21,
        }
    }
}

impl MasteryPolicy {
    pub fn is_mastered(&self, schedule: &ReviewSchedule) -> bool {
        schedule.repetitions >= self.min_repetitions
            && schedule.interval_days >= self.min_interval_days
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStats {
    pub total: usize,
    pub due: usize,
    pub mastered: usize,
    /// Everything not mastered, including new and recently failed cards.
    pub learning: usize,
}

pub fn aggregate(schedules: &[ReviewSchedule], now: DateTime<Utc>, policy: &MasteryPolicy) -> DeckStats {
    let total = schedules.len();
    let due = schedules.iter().filter(|s| s.is_due(now)).count();
    let mastered = schedules.iter().filter(|s| policy.is_mastered(s)).count();

    DeckStats {
        total,
        due,
        mastered,
        learning: total - mastered,
    }
}
