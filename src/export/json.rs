//! JSON import/export for flashcard decks and review logs.
//! Decks are saved without their schedules; review logs are the audit trail.

use crate::error::Result;
use crate::models::{Deck, ReviewEvent};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use tracing::info;

/// Exports a deck to a JSON file at the specified path.
pub fn export_deck(deck: &Deck, path: impl AsRef<Path>) -> Result<()> {
    write_pretty(&serde_json::to_string_pretty(deck)?, path.as_ref())?;
    info!(deck = %deck.name, path = %path.as_ref().display(), "deck exported");
    Ok(())
}

/// Imports a deck from a JSON file.
/// Fails if the file doesn't exist or contains invalid JSON.
pub fn import_deck(path: impl AsRef<Path>) -> Result<Deck> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let deck: Deck = serde_json::from_reader(reader)?;

    info!(deck = %deck.name, path = %path.as_ref().display(), "deck read");
    Ok(deck)
}

/// Writes review events as a pretty JSON array.
pub fn export_review_log(events: &[ReviewEvent], path: impl AsRef<Path>) -> Result<()> {
    write_pretty(&serde_json::to_string_pretty(events)?, path.as_ref())?;
    info!(events = events.len(), path = %path.as_ref().display(), "review log exported");
    Ok(())
}

fn write_pretty(json: &str, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}
