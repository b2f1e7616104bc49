//! SQLite storage for decks, flashcards, review schedules and review events
//!
//! Handles database initialization, card creation (which also creates the
//! card's default schedule), schedule updates and the append-only review log.

use super::ScheduleStore;
use crate::error::{Error, Result};
use crate::models::{CardId, Deck, Flashcard, ReviewEvent, ReviewSchedule};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::{debug, info, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS decks (
        name TEXT PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS flashcards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        deck_name TEXT NOT NULL,
        front TEXT NOT NULL,
        back TEXT NOT NULL,
        hint TEXT,
        FOREIGN KEY (deck_name) REFERENCES decks(name) ON DELETE CASCADE,
        UNIQUE(deck_name, front)
    );

    CREATE TABLE IF NOT EXISTS review_schedules (
        card_id INTEGER PRIMARY KEY,
        ease_factor REAL NOT NULL DEFAULT 2.5,
        interval_days INTEGER NOT NULL DEFAULT 0,
        repetitions INTEGER NOT NULL DEFAULT 0,
        due_at INTEGER NOT NULL,
        last_reviewed_at INTEGER,
        FOREIGN KEY (card_id) REFERENCES flashcards(id) ON DELETE CASCADE
    );

    -- Append-only; rows outlive the card they describe.
    CREATE TABLE IF NOT EXISTS review_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id INTEGER NOT NULL,
        deck_name TEXT NOT NULL,
        quality INTEGER NOT NULL,
        response_time_ms INTEGER NOT NULL,
        reviewed_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS app_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_flashcards_deck ON flashcards(deck_name);
    CREATE INDEX IF NOT EXISTS idx_schedules_due ON review_schedules(due_at);
    CREATE INDEX IF NOT EXISTS idx_events_deck ON review_events(deck_name);
"#;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let store = Self::init(conn)?;
        info!(path = %path.as_ref().display(), "database ready");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT OR IGNORE INTO app_state (key, value) VALUES ('day_offset', '0')",
            (),
        )?;
        Ok(Self { conn })
    }

    /// Days the simulated clock runs ahead of the wall clock.
    pub fn day_offset(&self) -> Result<i64> {
        let value: String = self.conn.query_row(
            "SELECT value FROM app_state WHERE key = 'day_offset'",
            [],
            |row| row.get(0),
        )?;
        value
            .parse::<i64>()
            .map_err(|_| Error::Config(format!("corrupt day_offset value {value:?}")))
    }

    /// Moves the simulated clock one day ahead and returns the new offset.
    pub fn advance_day(&self) -> Result<i64> {
        let offset = self.day_offset()? + 1;
        self.conn.execute(
            "UPDATE app_state SET value = ?1 WHERE key = 'day_offset'",
            params![offset.to_string()],
        )?;
        info!(offset, "advanced simulated day");
        Ok(offset)
    }

    /// Creates a deck. Returns false if it already existed.
    pub fn create_deck(&self, name: &str) -> Result<bool> {
        let inserted = self
            .conn
            .execute("INSERT OR IGNORE INTO decks (name) VALUES (?1)", params![name])?;
        if inserted > 0 {
            info!(deck = name, "deck created");
        }
        Ok(inserted > 0)
    }

    pub fn deck_exists(&self, name: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM decks WHERE name = ?1", params![name], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn deck_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM decks ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Adds a flashcard to a deck and creates its default schedule, due at `now`.
    ///
    /// Re-adding an identical card returns the existing id. A different back or
    /// hint for a front already in the deck is a `DuplicateCard` error.
    pub fn add_flashcard(
        &mut self,
        deck_name: &str,
        front: &str,
        back: &str,
        hint: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CardId> {
        let tx = self.conn.transaction()?;
        let card_id = match insert_flashcard(&tx, deck_name, front, back, hint, now)? {
            Insertion::Inserted(id) | Insertion::Existing(id) => id,
            Insertion::Conflict(_) => {
                return Err(Error::DuplicateCard {
                    deck: deck_name.to_string(),
                    front: front.to_string(),
                });
            }
        };
        tx.commit()?;
        Ok(card_id)
    }

    /// Deletes a card and, through the cascade, its schedule.
    pub fn delete_flashcard(&self, card_id: CardId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM flashcards WHERE id = ?1", params![card_id])?;
        Ok(deleted > 0)
    }

    /// Imports every card of a deck in one transaction. Returns the number of
    /// cards actually inserted; repeated fronts are skipped.
    pub fn import_deck(&mut self, deck: &Deck, now: DateTime<Utc>) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("INSERT OR IGNORE INTO decks (name) VALUES (?1)", params![deck.name])?;
        let mut inserted = 0;
        for card in &deck.flashcards {
            match insert_flashcard(
                &tx,
                &deck.name,
                &card.front,
                &card.back,
                card.hint.as_deref(),
                now,
            )? {
                Insertion::Inserted(_) => inserted += 1,
                Insertion::Existing(id) => {
                    warn!(deck = %deck.name, card_id = id, front = %card.front, "skipped repeated card");
                }
                Insertion::Conflict(id) => {
                    warn!(
                        deck = %deck.name,
                        card_id = id,
                        front = %card.front,
                        "skipped card whose front is already in the deck with different content"
                    );
                }
            }
        }
        tx.commit()?;

        info!(deck = %deck.name, cards = inserted, skipped = deck.flashcards.len() - inserted, "deck imported");
        Ok(inserted)
    }

    pub fn load_deck(&self, deck_name: &str) -> Result<Deck> {
        self.require_deck(deck_name)?;

        let mut stmt = self
            .conn
            .prepare("SELECT id, front, back, hint FROM flashcards WHERE deck_name = ?1 ORDER BY id")?;
        let flashcards = stmt
            .query_map(params![deck_name], flashcard_from_row)?
            .collect::<rusqlite::Result<Vec<Flashcard>>>()?;

        Ok(Deck {
            name: deck_name.to_string(),
            flashcards,
        })
    }

    /// Review log for a deck, oldest first.
    pub fn review_events(&self, deck_name: &str) -> Result<Vec<ReviewEvent>> {
        self.require_deck(deck_name)?;

        let mut stmt = self.conn.prepare(
            "SELECT card_id, quality, response_time_ms, reviewed_at
             FROM review_events
             WHERE deck_name = ?1
             ORDER BY reviewed_at ASC, id ASC",
        )?;
        let events = stmt
            .query_map(params![deck_name], |row| {
                Ok(ReviewEvent {
                    card_id: row.get(0)?,
                    quality: row.get(1)?,
                    response_time_ms: row.get::<_, i64>(2)?.max(0) as u64,
                    reviewed_at: from_millis(row.get(3)?)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    fn require_deck(&self, deck_name: &str) -> Result<()> {
        if self.deck_exists(deck_name)? {
            Ok(())
        } else {
            Err(Error::UnknownDeck(deck_name.to_string()))
        }
    }
}

impl ScheduleStore for SqliteStore {
    fn load_schedule(&self, card_id: CardId) -> Result<ReviewSchedule> {
        self.conn
            .query_row(
                "SELECT card_id, ease_factor, interval_days, repetitions, due_at, last_reviewed_at
                 FROM review_schedules WHERE card_id = ?1",
                params![card_id],
                schedule_from_row,
            )
            .optional()?
            .ok_or(Error::UnknownCard(card_id))
    }

    fn save_schedule(&mut self, schedule: &ReviewSchedule) -> Result<()> {
        write_schedule(&self.conn, schedule)
    }

    fn append_review_event(&mut self, event: &ReviewEvent) -> Result<()> {
        write_event(&self.conn, event)
    }

    /// Saves the schedule and appends the event atomically.
    fn record_review(&mut self, schedule: &ReviewSchedule, event: &ReviewEvent) -> Result<()> {
        let tx = self.conn.transaction()?;
        write_schedule(&tx, schedule)?;
        write_event(&tx, event)?;
        tx.commit()?;
        Ok(())
    }

    fn deck_schedules(&self, deck_name: &str) -> Result<Vec<ReviewSchedule>> {
        self.require_deck(deck_name)?;

        let mut stmt = self.conn.prepare(
            "SELECT r.card_id, r.ease_factor, r.interval_days, r.repetitions, r.due_at, r.last_reviewed_at
             FROM flashcards f
             JOIN review_schedules r ON f.id = r.card_id
             WHERE f.deck_name = ?1
             ORDER BY r.card_id",
        )?;
        let schedules = stmt
            .query_map(params![deck_name], schedule_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schedules)
    }

    fn load_card(&self, card_id: CardId) -> Result<Flashcard> {
        self.conn
            .query_row(
                "SELECT id, front, back, hint FROM flashcards WHERE id = ?1",
                params![card_id],
                flashcard_from_row,
            )
            .optional()?
            .ok_or(Error::UnknownCard(card_id))
    }
}

/// What happened to a card passed to `insert_flashcard`.
enum Insertion {
    Inserted(CardId),
    /// Same front, back and hint already present.
    Existing(CardId),
    /// Same front present with a different back or hint. Nothing was written.
    Conflict(CardId),
}

fn insert_flashcard(
    conn: &Connection,
    deck_name: &str,
    front: &str,
    back: &str,
    hint: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Insertion> {
    let deck_found = conn
        .query_row("SELECT 1 FROM decks WHERE name = ?1", params![deck_name], |_| Ok(()))
        .optional()?;
    if deck_found.is_none() {
        return Err(Error::UnknownDeck(deck_name.to_string()));
    }

    let existing = conn
        .query_row(
            "SELECT id, front, back, hint FROM flashcards WHERE deck_name = ?1 AND front = ?2",
            params![deck_name, front],
            flashcard_from_row,
        )
        .optional()?;
    if let Some(card) = existing {
        if card.back == back && card.hint.as_deref() == hint {
            return Ok(Insertion::Existing(card.id));
        }
        return Ok(Insertion::Conflict(card.id));
    }

    conn.execute(
        "INSERT INTO flashcards (deck_name, front, back, hint) VALUES (?1, ?2, ?3, ?4)",
        params![deck_name, front, back, hint],
    )?;
    let card_id: CardId = conn.last_insert_rowid();

    let schedule = ReviewSchedule::new(card_id, now);
    conn.execute(
        "INSERT OR IGNORE INTO review_schedules
         (card_id, ease_factor, interval_days, repetitions, due_at, last_reviewed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
        params![
            card_id,
            schedule.ease_factor,
            schedule.interval_days,
            schedule.repetitions,
            to_millis(schedule.due_at)
        ],
    )?;

    debug!(card_id, deck = deck_name, "flashcard added");
    Ok(Insertion::Inserted(card_id))
}

fn write_schedule(conn: &Connection, schedule: &ReviewSchedule) -> Result<()> {
    let updated = conn.execute(
        "UPDATE review_schedules
         SET ease_factor = ?1, interval_days = ?2, repetitions = ?3, due_at = ?4, last_reviewed_at = ?5
         WHERE card_id = ?6",
        params![
            schedule.ease_factor,
            schedule.interval_days,
            schedule.repetitions,
            to_millis(schedule.due_at),
            schedule.last_reviewed_at.map(to_millis),
            schedule.card_id
        ],
    )?;

    if updated == 0 {
        return Err(Error::UnknownCard(schedule.card_id));
    }
    Ok(())
}

fn write_event(conn: &Connection, event: &ReviewEvent) -> Result<()> {
    let inserted = conn.execute(
        "INSERT INTO review_events (card_id, deck_name, quality, response_time_ms, reviewed_at)
         SELECT id, deck_name, ?2, ?3, ?4 FROM flashcards WHERE id = ?1",
        params![
            event.card_id,
            event.quality,
            i64::try_from(event.response_time_ms).unwrap_or(i64::MAX),
            to_millis(event.reviewed_at)
        ],
    )?;

    if inserted == 0 {
        return Err(Error::UnknownCard(event.card_id));
    }
    Ok(())
}

fn flashcard_from_row(row: &Row<'_>) -> rusqlite::Result<Flashcard> {
    Ok(Flashcard {
        id: row.get(0)?,
        front: row.get(1)?,
        back: row.get(2)?,
        hint: row.get(3)?,
    })
}

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewSchedule> {
    Ok(ReviewSchedule {
        card_id: row.get(0)?,
        ease_factor: row.get(1)?,
        interval_days: row.get(2)?,
        repetitions: row.get(3)?,
        due_at: from_millis(row.get(4)?)?,
        last_reviewed_at: row.get::<_, Option<i64>>(5)?.map(from_millis).transpose()?,
    })
}

fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

fn from_millis(millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(rusqlite::Error::IntegralValueOutOfRange(0, millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn store_with_deck() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_deck("Polish Vocabulary").unwrap();
        store
    }

    #[test]
    fn test_create_deck_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.create_deck("Polish").unwrap());
        assert!(!store.create_deck("Polish").unwrap());
        assert_eq!(store.deck_names().unwrap(), vec!["Polish".to_string()]);
    }

    #[test]
    fn test_add_flashcard_creates_default_schedule() {
        let mut store = store_with_deck();
        let id = store
            .add_flashcard("Polish Vocabulary", "cześć", "hello", Some("greeting"), now())
            .unwrap();

        let schedule = store.load_schedule(id).unwrap();
        assert_eq!(schedule, ReviewSchedule::new(id, now()));

        let card = store.load_card(id).unwrap();
        assert_eq!(card.front, "cześć");
        assert_eq!(card.hint.as_deref(), Some("greeting"));
    }

    #[test]
    fn test_duplicate_front_reuses_card() {
        let mut store = store_with_deck();
        let first = store
            .add_flashcard("Polish Vocabulary", "tak", "yes", None, now())
            .unwrap();
        let second = store
            .add_flashcard("Polish Vocabulary", "tak", "yes", None, now() + Duration::days(2))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.load_schedule(first).unwrap().due_at, now());
    }

    #[test]
    fn test_conflicting_back_is_rejected() {
        let mut store = store_with_deck();
        let id = store
            .add_flashcard("Polish Vocabulary", "tak", "yes", None, now())
            .unwrap();

        let err = store
            .add_flashcard("Polish Vocabulary", "tak", "yeah", None, now())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCard { ref front, .. } if front == "tak"));

        let err = store
            .add_flashcard("Polish Vocabulary", "tak", "yes", Some("short"), now())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCard { .. }));

        let card = store.load_card(id).unwrap();
        assert_eq!(card.back, "yes");
        assert_eq!(card.hint, None);
    }

    #[test]
    fn test_add_to_missing_deck_fails() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = store.add_flashcard("Nope", "a", "b", None, now()).unwrap_err();
        assert!(matches!(err, Error::UnknownDeck(_)));
    }

    #[test]
    fn test_record_review_round_trips_schedule() {
        let mut store = store_with_deck();
        let id = store
            .add_flashcard("Polish Vocabulary", "dziękuję", "thank you", None, now())
            .unwrap();
        let reviewed = now() + Duration::milliseconds(4321);
        let schedule = ReviewSchedule {
            card_id: id,
            ease_factor: 2.6,
            interval_days: 6,
            repetitions: 2,
            due_at: reviewed + Duration::days(6),
            last_reviewed_at: Some(reviewed),
        };
        let event = ReviewEvent {
            card_id: id,
            quality: 5,
            response_time_ms: 2100,
            reviewed_at: reviewed,
        };

        store.record_review(&schedule, &event).unwrap();

        assert_eq!(store.load_schedule(id).unwrap(), schedule);
        assert_eq!(store.review_events("Polish Vocabulary").unwrap(), vec![event]);
    }

    #[test]
    fn test_record_review_for_unknown_card_writes_nothing() {
        let mut store = store_with_deck();
        let schedule = ReviewSchedule::new(99, now());
        let event = ReviewEvent {
            card_id: 99,
            quality: 3,
            response_time_ms: 0,
            reviewed_at: now(),
        };

        assert!(matches!(
            store.record_review(&schedule, &event),
            Err(Error::UnknownCard(99))
        ));
        assert!(store.review_events("Polish Vocabulary").unwrap().is_empty());
    }

    #[test]
    fn test_deck_schedules_and_unknown_deck() {
        let mut store = store_with_deck();
        store.create_deck("Other").unwrap();
        store.add_flashcard("Polish Vocabulary", "a", "1", None, now()).unwrap();
        store.add_flashcard("Polish Vocabulary", "b", "2", None, now()).unwrap();
        store.add_flashcard("Other", "c", "3", None, now()).unwrap();

        assert_eq!(store.deck_schedules("Polish Vocabulary").unwrap().len(), 2);
        assert!(matches!(store.deck_schedules("Missing"), Err(Error::UnknownDeck(_))));
    }

    #[test]
    fn test_delete_flashcard_cascades_schedule_and_keeps_events() {
        let mut store = store_with_deck();
        let id = store
            .add_flashcard("Polish Vocabulary", "nie", "no", None, now())
            .unwrap();
        let event = ReviewEvent {
            card_id: id,
            quality: 4,
            response_time_ms: 900,
            reviewed_at: now(),
        };
        store.append_review_event(&event).unwrap();

        assert!(store.delete_flashcard(id).unwrap());
        assert!(matches!(store.load_schedule(id), Err(Error::UnknownCard(_))));
        assert_eq!(store.review_events("Polish Vocabulary").unwrap().len(), 1);
    }

    #[test]
    fn test_huge_response_time_is_clamped() {
        let mut store = store_with_deck();
        let id = store
            .add_flashcard("Polish Vocabulary", "kot", "cat", None, now())
            .unwrap();
        let event = ReviewEvent {
            card_id: id,
            quality: 4,
            response_time_ms: u64::MAX,
            reviewed_at: now(),
        };
        store.append_review_event(&event).unwrap();

        let events = store.review_events("Polish Vocabulary").unwrap();
        assert_eq!(events[0].response_time_ms, i64::MAX as u64);
    }

    #[test]
    fn test_corrupt_day_offset_is_reported() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute("UPDATE app_state SET value = 'garbage' WHERE key = 'day_offset'", [])
            .unwrap();

        assert!(matches!(store.day_offset(), Err(Error::Config(_))));
        assert!(matches!(store.advance_day(), Err(Error::Config(_))));
    }

    #[test]
    fn test_advance_day() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.day_offset().unwrap(), 0);
        assert_eq!(store.advance_day().unwrap(), 1);
        assert_eq!(store.advance_day().unwrap(), 2);
        assert_eq!(store.day_offset().unwrap(), 2);
    }

    #[test]
    fn test_import_and_load_deck() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let deck = Deck {
            name: "Imported".to_string(),
            flashcards: vec![
                Flashcard::new(0, "hello", "cześć"),
                Flashcard::new(0, "goodbye", "do widzenia").with_hint("formal"),
            ],
        };

        assert_eq!(store.import_deck(&deck, now()).unwrap(), 2);

        let loaded = store.load_deck("Imported").unwrap();
        assert_eq!(loaded.flashcards.len(), 2);
        assert_eq!(loaded.flashcards[1].hint.as_deref(), Some("formal"));
        assert!(loaded.flashcards.iter().all(|c| c.id > 0));
    }

    #[test]
    fn test_import_counts_only_inserted_cards() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let deck = Deck {
            name: "Imported".to_string(),
            flashcards: vec![
                Flashcard::new(0, "hello", "cześć"),
                Flashcard::new(0, "hello", "cześć"),
                Flashcard::new(0, "hello", "witaj"),
                Flashcard::new(0, "thanks", "dzięki"),
            ],
        };

        assert_eq!(store.import_deck(&deck, now()).unwrap(), 2);

        let loaded = store.load_deck("Imported").unwrap();
        assert_eq!(loaded.flashcards.len(), 2);
        assert_eq!(loaded.flashcards[0].back, "cześć");
    }
}
