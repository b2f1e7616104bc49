//! Due-card selection.

use super::{CardId, ReviewSchedule};
use chrono::{DateTime, Utc};

/// Returns up to `limit` due cards, most overdue first.
///
/// Ties on due time are broken by card id so the queue is deterministic.
pub fn select_due(schedules: &[ReviewSchedule], now: DateTime<Utc>, limit: usize) -> Vec<CardId> {
    let mut due: Vec<&ReviewSchedule> = schedules.iter().filter(|s| s.is_due(now)).collect();
    due.sort_by(|a, b| a.due_at.cmp(&b.due_at).then(a.card_id.cmp(&b.card_id)));

    due.into_iter().take(limit).map(|s| s.card_id).collect()
}
