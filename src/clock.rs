//! Time sources for scheduling and response timing.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock shifted forward by a number of simulated days.
///
/// Used by the CLI "next day" command so reviews can be fast-forwarded
/// without waiting real days, while response timing stays wall-clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct OffsetClock {
    pub offset_days: i64,
}

impl OffsetClock {
    pub fn new(offset_days: i64) -> Self {
        Self { offset_days }
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::days(self.offset_days)
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Clone, Debug)]
pub struct ManualClock {
    instant: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            instant: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut instant = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *instant += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut instant = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *instant = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner())
    }
}
