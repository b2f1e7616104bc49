//! Error types for the review engine

use crate::models::CardId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid quality {0}: expected a rating between 0 and 5")]
    InvalidQuality(u8),

    #[error("cannot {operation} while session is {state}")]
    OutOfOrderOperation {
        operation: &'static str,
        state: &'static str,
    },

    #[error("unknown card: {0}")]
    UnknownCard(CardId),

    #[error("unknown deck: {0}")]
    UnknownDeck(String),

    #[error("deck '{deck}' already has a different card with front '{front}'")]
    DuplicateCard { deck: String, front: String },

    /// Storage failed to save a schedule or event. The review was not recorded
    /// and may be retried with the same quality.
    #[error("persistence failure: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }

    pub(crate) fn out_of_order(operation: &'static str, state: &'static str) -> Self {
        Error::OutOfOrderOperation { operation, state }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Persistence(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
