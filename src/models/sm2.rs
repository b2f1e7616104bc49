//! SM-2 (SuperMemo 2) spaced repetition algorithm implementation.
//!
//! The SM-2 algorithm calculates review intervals based on recall quality:
//! - Each card has an ease factor (EF) that adjusts based on performance
//! - Quality grades 0-2: EF drops by 0.2, interval resets to 1 day, repetitions to 0
//! - Quality grades 3-5: interval grows progressively (1 day → 6 days → EF multiplier)
//! - EF never falls below 1.3

use super::ReviewSchedule;
use super::review_schedule::MIN_EASE_FACTOR;
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const FAILURE_EASE_PENALTY: f64 = 0.2;

/// Upper bound on a scheduled interval (about a century).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Self-reported recall strength: 0 = complete blackout, 5 = perfect response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(Error::InvalidQuality(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Recalled correctly (3 or above).
    pub fn is_success(self) -> bool {
        self.0 >= 3
    }
}

impl TryFrom<u8> for Quality {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> u8 {
        quality.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The scheduling triple produced by one SM-2 step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sm2Step {
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
}

/// One SM-2 step. Pure and deterministic.
pub fn advance(quality: Quality, ease_factor: f64, interval_days: u32, repetitions: u32) -> Sm2Step {
    if !quality.is_success() {
        return Sm2Step {
            ease_factor: (ease_factor - FAILURE_EASE_PENALTY).max(MIN_EASE_FACTOR),
            interval_days: 1,
            repetitions: 0,
        };
    }

    // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))
    let miss = (Quality::MAX - quality.value()) as f64;
    let new_ef = (ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR);

    let new_interval = match repetitions {
        0 => 1,
        1 => 6,
        _ => {
            let grown = (interval_days.min(MAX_INTERVAL_DAYS) as f64 * new_ef).round();
            grown.min(MAX_INTERVAL_DAYS as f64) as u32
        }
    };

    Sm2Step {
        ease_factor: new_ef,
        interval_days: new_interval,
        repetitions: repetitions.saturating_add(1),
    }
}

/// Applies a review to a schedule: due date becomes `reviewed_at + interval`.
pub fn apply(schedule: &ReviewSchedule, quality: Quality, reviewed_at: DateTime<Utc>) -> ReviewSchedule {
    let step = advance(
        quality,
        schedule.ease_factor,
        schedule.interval_days,
        schedule.repetitions,
    );

    debug!(
        card_id = schedule.card_id,
        quality = quality.value(),
        ease_factor = step.ease_factor,
        interval_days = step.interval_days,
        repetitions = step.repetitions,
        "scheduled next review"
    );

    ReviewSchedule {
        card_id: schedule.card_id,
        ease_factor: step.ease_factor,
        interval_days: step.interval_days,
        repetitions: step.repetitions,
        due_at: reviewed_at
            .checked_add_signed(Duration::days(step.interval_days as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        last_reviewed_at: Some(reviewed_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_quality_range() {
        for value in 0..=5 {
            assert!(Quality::new(value).is_ok());
        }
        assert!(matches!(Quality::new(6), Err(Error::InvalidQuality(6))));
        assert!(matches!(Quality::try_from(255u8), Err(Error::InvalidQuality(255))));
    }

    #[test]
    fn test_quality_serde_rejects_out_of_range() {
        assert_eq!(serde_json::to_string(&q(4)).unwrap(), "4");
        assert!(serde_json::from_str::<Quality>("7").is_err());
    }

    #[test]
    fn test_first_review() {
        let next = advance(q(4), 2.5, 0, 0);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.repetitions, 1);
        assert_close(next.ease_factor, 2.5);
    }

    #[test]
    fn test_second_review() {
        let next = advance(q(5), 2.5, 6, 1);
        assert_close(next.ease_factor, 2.6);
        assert_eq!(next.interval_days, 6);
        assert_eq!(next.repetitions, 2);
    }

    #[test]
    fn test_third_review_multiplies_interval() {
        let next = advance(q(5), 2.6, 6, 2);
        assert_eq!(next.interval_days, 16);
        assert_eq!(next.repetitions, 3);
    }

    #[test]
    fn test_difficult_recall_lowers_ease() {
        let next = advance(q(3), 2.5, 6, 2);
        assert_close(next.ease_factor, 2.36);
        assert_eq!(next.interval_days, 14);
    }

    #[test]
    fn test_quality_below_3_resets() {
        let next = advance(q(0), 2.5, 16, 3);
        assert_close(next.ease_factor, 2.3);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.repetitions, 0);
    }

    #[test]
    fn test_every_failure_grade_resets() {
        for value in 0..3 {
            let next = advance(q(value), 2.0, 40, 7);
            assert_close(next.ease_factor, 1.8);
            assert_eq!(next.interval_days, 1);
            assert_eq!(next.repetitions, 0);
        }
    }

    #[test]
    fn test_ef_floor() {
        let mut step = Sm2Step {
            ease_factor: 2.5,
            interval_days: 10,
            repetitions: 5,
        };
        for _ in 0..20 {
            step = advance(q(0), step.ease_factor, step.interval_days, step.repetitions);
            assert!(step.ease_factor >= MIN_EASE_FACTOR);
        }
        assert_close(step.ease_factor, MIN_EASE_FACTOR);

        // Hard successes at the floor stay at the floor too.
        let next = advance(q(3), MIN_EASE_FACTOR, 6, 2);
        assert_close(next.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_perfect_streak_never_shrinks_interval() {
        let mut step = advance(q(5), 2.5, 0, 0);
        let mut previous = step.interval_days;
        for _ in 0..12 {
            step = advance(q(5), step.ease_factor, step.interval_days, step.repetitions);
            if step.repetitions > 2 {
                assert!(step.interval_days >= previous);
            }
            previous = step.interval_days;
        }
        assert!(previous > 365);
    }

    #[test]
    fn test_extreme_counters_saturate() {
        let next = advance(q(5), 2.5, 10, u32::MAX);
        assert_eq!(next.repetitions, u32::MAX);
        assert_eq!(next.interval_days, 26);

        let next = advance(q(5), 2.5, u32::MAX / 2, 5);
        assert_eq!(next.interval_days, MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_interval_stays_capped_and_non_decreasing() {
        let mut step = advance(q(4), 2.5, MAX_INTERVAL_DAYS - 100, 9);
        assert_eq!(step.interval_days, MAX_INTERVAL_DAYS);
        for _ in 0..5 {
            let next = advance(q(4), step.ease_factor, step.interval_days, step.repetitions);
            assert!(next.interval_days >= step.interval_days);
            assert!(next.interval_days <= MAX_INTERVAL_DAYS);
            step = next;
        }
    }

    #[test]
    fn test_apply_with_extreme_schedule() {
        let now = Utc::now();
        let schedule = ReviewSchedule {
            interval_days: u32::MAX / 2,
            repetitions: 5,
            ..ReviewSchedule::new(8, now)
        };

        let next = apply(&schedule, q(5), now);
        assert_eq!(next.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(next.due_at, now + Duration::days(MAX_INTERVAL_DAYS as i64));

        let late = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        let next = apply(&schedule, q(5), late);
        assert_eq!(next.due_at, DateTime::<Utc>::MAX_UTC);
        assert_eq!(next.last_reviewed_at, Some(late));
    }

    #[test]
    fn test_advance_is_deterministic() {
        assert_eq!(advance(q(4), 2.1, 9, 4), advance(q(4), 2.1, 9, 4));
    }

    #[test]
    fn test_apply_sets_due_from_review_time() {
        let now = Utc::now();
        let schedule = ReviewSchedule {
            card_id: 3,
            ease_factor: 2.6,
            interval_days: 6,
            repetitions: 2,
            due_at: now,
            last_reviewed_at: None,
        };

        let next = apply(&schedule, q(5), now);
        assert_eq!(next.card_id, 3);
        assert_eq!(next.interval_days, 16);
        assert_eq!(next.last_reviewed_at, Some(now));
        assert_eq!(next.due_at, now + Duration::days(16));
    }
}
