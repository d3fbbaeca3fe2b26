//! Data models for the study scheduler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A deck is a collection of flashcards belonging to a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(user_id: Uuid, title: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            is_archived: false,
            created_at: now,
        }
    }
}

/// Lifecycle status of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    /// Shown in listings and eligible for study
    Active,
    /// Kept on disk but excluded from listings and study
    Archived,
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A flashcard with question (front) and answer (back)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub front_text: String,
    pub back_text: String,
    #[serde(default)]
    pub status: CardStatus,
    /// Insertion counter within the deck; tiebreak for creation-time ordering
    #[serde(default)]
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn new(deck_id: Uuid, front_text: String, back_text: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            deck_id,
            front_text,
            back_text,
            status: CardStatus::Active,
            position: 0,
            created_at: now,
        }
    }
}

/// Scheduling record for a card, created lazily on the first answer
///
/// A card without one has never been scheduled and is always due.
/// `repetitions` and `lapses` only ever increase; `due_at` is overwritten
/// wholesale on every answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSrs {
    pub card_id: Uuid,
    /// When the card should next be shown
    pub due_at: DateTime<Utc>,
    /// Whole-day distance from the day of the last answer to `due_at`;
    /// zero or negative when the client chose a due date in the past
    pub interval_days: i64,
    pub last_reviewed_at: DateTime<Utc>,
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default)]
    pub lapses: u32,
}

impl CardSrs {
    pub fn new(card_id: Uuid, due_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            card_id,
            due_at,
            interval_days: 0,
            last_reviewed_at: now,
            repetitions: 0,
            lapses: 0,
        }
    }
}

/// Mode a review session was started in when no mode was requested
pub const DEFAULT_SESSION_MODE: &str = "review";

/// Audit record marking that a study session started
///
/// Written once per session start and never read back by the scheduling
/// logic. `mode` is a free-form string so future modes ("cram") need no
/// data migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mode: String,
    pub created_at: DateTime<Utc>,
}

impl ReviewSession {
    pub fn new(user_id: Uuid, mode: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            mode: mode.unwrap_or(DEFAULT_SESSION_MODE).to_string(),
            created_at: now,
        }
    }
}
