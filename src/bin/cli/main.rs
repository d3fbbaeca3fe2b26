use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Duration;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use cardbox::clock::{Clock, SystemClock};
use cardbox::ladder::LADDER_DAYS;
use cardbox::models::{Card, Deck};
use cardbox::storage::CardStore;
use cardbox::study::{deck_overview, record_answer, start_study_session, ReviewAnswerBody};

#[derive(Parser)]
#[command(name = "cardbox-cli", about = "Cardbox flashcard study CLI", version)]
struct Cli {
    /// Use a specific data directory (default: platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deck management
    #[command(subcommand)]
    Deck(DeckCommand),

    /// Card management
    #[command(subcommand)]
    Card(CardCommand),

    /// List the cards due today in a deck
    Due {
        /// Deck title (case-insensitive prefix match)
        deck: String,
    },

    /// Run an interactive study session for a deck
    Study {
        /// Deck title (case-insensitive prefix match)
        deck: String,
    },
}

#[derive(Subcommand)]
enum DeckCommand {
    /// Create a new deck
    New {
        /// Deck title
        title: String,
    },

    /// List decks with due/total card counts
    Ls,

    /// Delete a deck and all its cards
    Rm {
        /// Deck title (case-insensitive prefix match)
        deck: String,
    },
}

#[derive(Subcommand)]
enum CardCommand {
    /// Add a card to a deck
    Add {
        /// Deck title (case-insensitive prefix match)
        deck: String,
        /// Front (question) text
        front: String,
        /// Back (answer) text
        back: String,
    },

    /// List the cards in a deck
    Ls {
        /// Deck title (case-insensitive prefix match)
        deck: String,
    },

    /// Archive a card so it no longer comes up for study
    Archive {
        /// Deck title (case-insensitive prefix match)
        deck: String,
        /// Front text (case-insensitive prefix match)
        front: String,
    },
}

/// Per-machine owner identity; decks created by this CLI all belong to it
fn load_or_create_owner(base: &PathBuf) -> anyhow::Result<Uuid> {
    let path = base.join("owner.json");
    if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        return Ok(serde_json::from_str(&content)?);
    }

    std::fs::create_dir_all(base)?;
    let owner = Uuid::new_v4();
    std::fs::write(&path, serde_json::to_string(&owner)?)?;
    Ok(owner)
}

fn resolve_deck(store: &CardStore, user_id: Uuid, name: &str) -> anyhow::Result<Deck> {
    let needle = name.to_lowercase();
    store
        .list_decks(user_id)?
        .into_iter()
        .filter(|d| !d.is_archived)
        .find(|d| d.title.to_lowercase().starts_with(&needle))
        .with_context(|| format!("No deck matching '{}'", name))
}

fn resolve_card(
    store: &CardStore,
    user_id: Uuid,
    deck: &Deck,
    front: &str,
) -> anyhow::Result<Card> {
    let needle = front.to_lowercase();
    store
        .list_cards(user_id, deck.id)?
        .into_iter()
        .find(|c| c.front_text.to_lowercase().starts_with(&needle))
        .with_context(|| format!("No card in '{}' matching '{}'", deck.title, front))
}

/// Prompt on stdout and read one trimmed line from stdin
fn ask(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn run_study(store: &CardStore, user_id: Uuid, deck: &Deck) -> anyhow::Result<()> {
    let clock = SystemClock;
    let session = start_study_session(store, &clock, user_id, deck.id)?;

    if session.current_card.is_none() {
        println!("Nothing due in '{}' today.", deck.title);
        return Ok(());
    }
    println!(
        "Studying '{}': {} card(s) due.",
        deck.title,
        session.queue.len()
    );

    let mut current = session.current_card;
    let mut step = session.current_card_state.step;

    while let Some(card) = current {
        println!();
        println!("  Q: {}", card.front_text);
        ask("  (enter to reveal) ")?;
        println!("  A: {}", card.back_text);

        let is_right = loop {
            match ask("  Did you know it? [y/n/q] ")?.as_str() {
                "y" | "Y" => break true,
                "n" | "N" => break false,
                "q" | "Q" => return Ok(()),
                _ => {}
            }
        };

        // A pass schedules the card out by the current rung's day count;
        // a fail leaves it due now.
        let now = clock.now();
        let due_at = if is_right {
            now + Duration::days(LADDER_DAYS[step])
        } else {
            now
        };

        let body = ReviewAnswerBody {
            card_id: Some(card.id),
            is_right: Some(is_right),
            step: Some(step as i64),
            due_at: Some(due_at.to_rfc3339()),
        };
        let res = record_answer(store, &clock, user_id, deck.id, &body)?;

        step = res.next_card.as_ref().map(|n| n.step).unwrap_or(0);
        current = res.next_card.map(|n| Card {
            id: n.id,
            deck_id: deck.id,
            front_text: n.front_text,
            back_text: n.back_text,
            status: Default::default(),
            position: 0,
            created_at: now.with_timezone(&chrono::Utc),
        });
    }

    println!();
    println!("Done, queue empty.");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let base = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .context("Could not determine the platform data directory")?
            .join("cardbox"),
    };

    let store = CardStore::new(base.clone());
    let clock = SystemClock;
    let user_id = load_or_create_owner(&base)?;
    let now = clock.now().with_timezone(&chrono::Utc);

    match cli.command {
        Command::Deck(DeckCommand::New { title }) => {
            let deck = store.create_deck(user_id, title, now)?;
            println!("Created deck '{}' ({})", deck.title, deck.id);
        }
        Command::Deck(DeckCommand::Ls) => {
            let overview = deck_overview(&store, &clock, user_id)?;
            if overview.is_empty() {
                println!("No decks yet. Create one with `deck new <title>`.");
            }
            for entry in overview {
                println!(
                    "{:<24} {:>3} due today / {:>3} cards",
                    entry.deck.title, entry.today_cards, entry.total_cards
                );
            }
        }
        Command::Deck(DeckCommand::Rm { deck }) => {
            let deck = resolve_deck(&store, user_id, &deck)?;
            store.delete_deck(user_id, deck.id)?;
            println!("Deleted deck '{}'", deck.title);
        }
        Command::Card(CardCommand::Add { deck, front, back }) => {
            let deck = resolve_deck(&store, user_id, &deck)?;
            let card = store.create_card(user_id, deck.id, front, back, now)?;
            println!("Added card '{}' to '{}'", card.front_text, deck.title);
        }
        Command::Card(CardCommand::Ls { deck }) => {
            let deck = resolve_deck(&store, user_id, &deck)?;
            for card in store.list_cards(user_id, deck.id)? {
                println!("{:<32} {}", card.front_text, card.back_text);
            }
        }
        Command::Card(CardCommand::Archive { deck, front }) => {
            let deck = resolve_deck(&store, user_id, &deck)?;
            let card = resolve_card(&store, user_id, &deck, &front)?;
            store.archive_card(user_id, card.id)?;
            println!("Archived card '{}'", card.front_text);
        }
        Command::Due { deck } => {
            let deck = resolve_deck(&store, user_id, &deck)?;
            let due = store.due_cards(user_id, deck.id, clock.now())?;
            if due.is_empty() {
                println!("Nothing due in '{}' today.", deck.title);
            }
            for card in due {
                println!("{}", card.front_text);
            }
        }
        Command::Study { deck } => {
            let deck = resolve_deck(&store, user_id, &deck)?;
            run_study(&store, user_id, &deck)?;
        }
    }

    Ok(())
}
