//! Per-card scheduling state.
use super::CardId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewSchedule {
    pub card_id: CardId,
    pub ease_factor: f64,
    /// 0 until the first successful review.
    pub interval_days: u32,
    /// Consecutive reviews rated 3 or above.
    pub repetitions: u32,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewSchedule {
    /// Default schedule for a freshly created card, due immediately.
    pub fn new(card_id: CardId, now: DateTime<Utc>) -> Self {
        Self {
            card_id,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 0,
            repetitions: 0,
            due_at: now,
            last_reviewed_at: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_schedule_is_due_immediately() {
        let now = Utc::now();
        let schedule = ReviewSchedule::new(7, now);

        assert_eq!(schedule.ease_factor, DEFAULT_EASE_FACTOR);
        assert_eq!(schedule.interval_days, 0);
        assert_eq!(schedule.repetitions, 0);
        assert!(schedule.last_reviewed_at.is_none());
        assert!(schedule.is_due(now));
        assert!(!schedule.is_due(now - Duration::seconds(1)));
    }
}
