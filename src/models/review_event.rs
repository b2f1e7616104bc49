//! Append-only audit record of a single review.
use super::CardId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub card_id: CardId,
    pub quality: u8,
    pub response_time_ms: u64,
    pub reviewed_at: DateTime<Utc>,
}
