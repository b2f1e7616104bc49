use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flashcards_engine::database::{ScheduleStore, SqliteStore};
use flashcards_engine::export::json::{export_deck, export_review_log, import_deck};
use flashcards_engine::models::ReviewSession;
use flashcards_engine::{Clock, EngineConfig, Error, OffsetClock, RateOutcome, ReviewEngine};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Spaced-repetition flashcard reviews from the terminal
#[derive(Parser)]
#[command(name = "flashcards")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SM-2 flashcard review engine", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file
    #[arg(long, default_value = "flashcards.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create sample data if the database is empty
    Init,

    /// Create a new deck
    NewDeck { name: String },

    /// Add a flashcard to a deck
    Add {
        deck: String,
        front: String,
        back: String,
        #[arg(long)]
        hint: Option<String>,
    },

    /// Import a deck from a JSON file
    Import { input: PathBuf },

    /// Export a deck to a JSON file
    Export { deck: String, output: PathBuf },

    /// List cards due for review
    Due {
        deck: String,
        /// Maximum number of cards (defaults to the configured session limit)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show deck statistics
    Stats { deck: String },

    /// Review due cards interactively
    Study {
        deck: String,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Export the review log of a deck to a JSON file
    History { deck: String, output: PathBuf },

    /// Advance the simulated date by one day
    NextDay,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = EngineConfig::load(&cli.config)?;
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let clock = OffsetClock::new(store.day_offset()?);
    let mut engine = ReviewEngine::with_clock(store, clock).with_mastery(config.mastery);

    match cli.command {
        Commands::Init => {
            if !cli.config.exists() {
                config.save(&cli.config)?;
                info!(path = %cli.config.display(), "wrote default config");
            }
            if engine.store().deck_names()?.is_empty() {
                seed_sample_deck(&mut engine)?;
                println!("Sample data created!");
            }
            for deck in engine.store().deck_names()? {
                let stats = engine.deck_stats(&deck)?;
                println!("  - {} ({} cards)", deck, stats.total);
            }
        }
        Commands::NewDeck { name } => {
            if engine.store().create_deck(&name)? {
                println!("Deck '{}' created.", name);
            } else {
                println!("Deck '{}' already exists.", name);
            }
        }
        Commands::Add {
            deck,
            front,
            back,
            hint,
        } => {
            let now = engine.clock().now();
            let id = engine
                .store_mut()
                .add_flashcard(&deck, &front, &back, hint.as_deref(), now)?;
            println!("Added card {} to '{}'.", id, deck);
        }
        Commands::Import { input } => {
            let deck = import_deck(&input)?;
            if engine.store().deck_exists(&deck.name)? {
                anyhow::bail!(
                    "deck '{}' already exists; rename it in the JSON file",
                    deck.name
                );
            }
            let now = engine.clock().now();
            let count = engine.store_mut().import_deck(&deck, now)?;
            println!("Deck '{}' imported with {} cards.", deck.name, count);
        }
        Commands::Export { deck, output } => {
            let deck = engine.store().load_deck(&deck)?;
            export_deck(&deck, &output)?;
            println!("Deck '{}' exported to {}.", deck.name, output.display());
        }
        Commands::Due { deck, limit } => {
            let queue = engine.due_queue(&deck, limit.unwrap_or(config.session_limit))?;
            if queue.is_empty() {
                println!("Nothing due in '{}'.", deck);
            }
            for card_id in queue {
                let card = engine.store().load_card(card_id)?;
                let schedule = engine.store().load_schedule(card_id)?;
                println!(
                    "{:>5}  {}  (due {}, interval {}d)",
                    card_id,
                    card.front,
                    schedule.due_at.format("%Y-%m-%d %H:%M"),
                    schedule.interval_days
                );
            }
        }
        Commands::Stats { deck } => {
            let stats = engine.deck_stats(&deck)?;
            println!("Deck:     {}", deck);
            println!("Total:    {}", stats.total);
            println!("Due:      {}", stats.due);
            println!("Mastered: {}", stats.mastered);
            println!("Learning: {}", stats.learning);
        }
        Commands::Study { deck, limit } => {
            let queue = engine.due_queue(&deck, limit.unwrap_or(config.session_limit))?;
            let mut session = engine.start_session(&deck, &queue)?;
            study(&mut engine, &mut session)?;
        }
        Commands::History { deck, output } => {
            let events = engine.store().review_events(&deck)?;
            export_review_log(&events, &output)?;
            println!("Exported {} reviews to {}.", events.len(), output.display());
        }
        Commands::NextDay => {
            let offset = engine.store().advance_day()?;
            let today = OffsetClock::new(offset).now();
            println!("Simulated date is now {}.", today.format("%Y-%m-%d"));
        }
    }

    Ok(())
}

fn seed_sample_deck(engine: &mut ReviewEngine<SqliteStore, OffsetClock>) -> Result<()> {
    let now = engine.clock().now();
    let store = engine.store_mut();
    store.create_deck("Polish Vocabulary")?;
    store.add_flashcard("Polish Vocabulary", "cześć", "hello", Some("informal greeting"), now)?;
    store.add_flashcard("Polish Vocabulary", "dziękuję", "thank you", None, now)?;
    store.add_flashcard("Polish Vocabulary", "proszę", "please", None, now)?;
    Ok(())
}

/// Reads one trimmed line; `None` on end of input.
fn read_line(lines: &mut impl Iterator<Item = io::Result<String>>, prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_string())),
        None => Ok(None),
    }
}

fn study(
    engine: &mut ReviewEngine<SqliteStore, OffsetClock>,
    session: &mut ReviewSession<OffsetClock>,
) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some(prompt) = session.current_prompt() {
        println!();
        println!("{}", session.phase_message());
        println!("Front: {}", prompt.front);

        if !session.is_revealed() {
            let input = read_line(&mut lines, "[Enter] reveal, [h] hint, [q] quit > ")?;
            match input.as_deref() {
                None | Some("q") => break,
                Some("h") => {
                    match session.hint()? {
                        Some(hint) => println!("Hint: {}", hint),
                        None => println!("(no hint for this card)"),
                    }
                    continue;
                }
                Some(_) => {
                    let revealed = session.reveal()?;
                    println!("Back:  {}", revealed.back);
                }
            }
        }

        let input = read_line(
            &mut lines,
            "Rate 0 blackout, 1 wrong, 2 familiar, 3 difficult, 4 correct, 5 perfect [q] quit > ",
        )?;
        let Some(input) = input else { break };
        if input == "q" {
            break;
        }
        let Ok(quality) = input.parse::<u8>() else {
            println!("Enter a number from 0 to 5.");
            continue;
        };

        match engine.rate(session, quality) {
            Ok(RateOutcome::Next { .. }) => {}
            Ok(RateOutcome::Completed(_)) => break,
            Err(Error::InvalidQuality(q)) => println!("{} is not a rating; use 0 to 5.", q),
            Err(err) if err.is_retriable() => {
                warn!(error = %err, "rating not saved");
                println!("Could not save this rating, please rate again.");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let stats = if session.is_completed() {
        session.stats()
    } else {
        session.abandon()
    };

    println!();
    if session.is_completed() {
        println!("Session complete!");
    } else {
        println!("Session stopped early.");
    }
    println!(
        "Reviewed {}/{}: {} correct, {} incorrect, average quality {:.2}",
        stats.reviewed, stats.total, stats.correct, stats.incorrect, stats.average_quality
    );
    Ok(())
}
