//! Study session flow: due-queue bootstrap and answer processing
//!
//! This is the outward surface an HTTP or UI layer wraps. The JSON field
//! names on the request and response types are wire contract and must not
//! change: `card_id`, `is_right`, `step`, `due_at`, `ok`, `next_card`,
//! `id`, `front_text`, `back_text`, `error`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::ladder::step_from_interval;
use crate::models::{Card, CardSrs, Deck, ReviewSession};
use crate::storage::{CardStore, StorageError};

#[derive(Error, Debug)]
pub enum StudyError {
    /// Request body was not parseable as the expected JSON shape
    #[error("Invalid JSON")]
    InvalidBody,

    /// Required request fields were absent
    #[error("Missing fields")]
    MissingFields,

    /// Deck or card absent, archived, or owned by someone else.
    /// Deliberately indistinguishable across users.
    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StudyError {
    /// JSON error body for the wire: `{"error": "<message>"}`
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }

    /// HTTP-equivalent status for an outer transport layer
    pub fn status(&self) -> u16 {
        match self {
            StudyError::InvalidBody | StudyError::MissingFields => 400,
            StudyError::NotFound => 404,
            StudyError::Storage(_) => 500,
        }
    }
}

/// Collapse storage lookups into NotFound so cross-user probes learn
/// nothing; everything else stays a storage failure.
fn not_found(err: StorageError) -> StudyError {
    match err {
        StorageError::DeckNotFound(_) | StorageError::CardNotFound(_) => StudyError::NotFound,
        other => StudyError::Storage(other),
    }
}

pub type Result<T> = std::result::Result<T, StudyError>;

/// Body of a review answer request
///
/// `step` is accepted but currently unused by the scheduling logic.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewAnswerBody {
    pub card_id: Option<Uuid>,
    pub is_right: Option<bool>,
    pub step: Option<i64>,
    pub due_at: Option<String>,
}

/// The next due card as exposed to the client
#[derive(Debug, Clone, Serialize)]
pub struct NextCard {
    pub id: Uuid,
    pub front_text: String,
    pub back_text: String,
    /// RFC 3339 due instant, or empty when the card was never scheduled
    pub due_at: String,
    pub step: usize,
}

/// Answer outcome plus the next card to show, if any
#[derive(Debug, Serialize)]
pub struct ReviewAnswerResponse {
    pub ok: bool,
    pub next_card: Option<NextCard>,
}

/// Ladder step and due instant of the card currently being shown
#[derive(Debug, Clone, Serialize)]
pub struct CardStepState {
    pub step: usize,
    /// RFC 3339 due instant, or empty when the card was never scheduled
    pub due_at: String,
}

fn srs_view(srs: Option<&CardSrs>) -> CardStepState {
    match srs {
        Some(srs) => CardStepState {
            step: step_from_interval(Some(srs.interval_days)),
            due_at: srs.due_at.to_rfc3339(),
        },
        None => CardStepState {
            step: 0,
            due_at: String::new(),
        },
    }
}

/// Everything the UI needs to run a study round for a deck
#[derive(Debug, Serialize)]
pub struct StudySession {
    pub deck: Deck,
    pub queue: Vec<Card>,
    pub current_card: Option<Card>,
    pub current_card_state: CardStepState,
    pub session: ReviewSession,
}

/// Start a study session for a deck
///
/// Selects the cards due today, determines the current card and its
/// step/due state, and records a [`ReviewSession`] for tracking.
/// Fails with NotFound when the deck doesn't exist, is archived, or
/// belongs to someone else.
pub fn start_study_session(
    store: &CardStore,
    clock: &dyn Clock,
    user_id: Uuid,
    deck_id: Uuid,
) -> Result<StudySession> {
    let deck = store.get_deck(user_id, deck_id).map_err(not_found)?;
    if deck.is_archived {
        return Err(StudyError::NotFound);
    }

    let now = clock.now();
    let queue = store.due_cards(user_id, deck_id, now)?;
    let current_card = queue.first().cloned();

    let current_card_state = match &current_card {
        Some(card) => srs_view(store.get_srs(user_id, card.id)?.as_ref()),
        None => srs_view(None),
    };

    let session = store.create_session(user_id, None, now.with_timezone(&Utc))?;
    log::info!("study session {} started for deck {}", session.id, deck_id);

    Ok(StudySession {
        deck,
        queue,
        current_card,
        current_card_state,
        session,
    })
}

/// Resolve the client-chosen next due timestamp
///
/// Two branches, kept explicit: an ISO-8601 timestamp parses as-is
/// (trailing `Z` meaning UTC, a naive timestamp coerced to UTC); anything
/// else (absent field, empty string, garbage) falls back to the current
/// instant instead of failing the request. The fallback is taken in UTC,
/// the same frame "today" is computed in, so it always yields a zero-day
/// interval regardless of the caller's offset.
fn resolve_due_at(raw: Option<&str>, now_utc: DateTime<Utc>) -> DateTime<FixedOffset> {
    if let Some(raw) = raw {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return parsed;
        }
        if let Ok(naive) = raw.parse::<NaiveDateTime>() {
            return naive.and_utc().fixed_offset();
        }
        log::warn!("unparseable due_at {:?}, falling back to now", raw);
    }

    now_utc.fixed_offset()
}

/// Record a pass/fail answer for a card and hand back the next due card
///
/// The card's scheduling record is created on first answer and its due
/// date overwritten wholesale on every answer; `repetitions` or `lapses`
/// is incremented (exactly one of the two) and the interval recomputed
/// from the current date. Repeated submissions double-count; callers
/// must not retry a delivered answer.
pub fn record_answer(
    store: &CardStore,
    clock: &dyn Clock,
    user_id: Uuid,
    deck_id: Uuid,
    body: &ReviewAnswerBody,
) -> Result<ReviewAnswerResponse> {
    let (card_id, is_right) = match (body.card_id, body.is_right) {
        (Some(card_id), Some(is_right)) => (card_id, is_right),
        _ => return Err(StudyError::MissingFields),
    };

    let card = store.get_card(user_id, card_id).map_err(not_found)?;
    if card.deck_id != deck_id {
        return Err(StudyError::NotFound);
    }

    let now = clock.now();
    let now_utc = now.with_timezone(&Utc);
    let due_at = resolve_due_at(body.due_at.as_deref(), now_utc);

    let mut srs = store
        .get_srs(user_id, card_id)?
        .unwrap_or_else(|| CardSrs::new(card_id, due_at.with_timezone(&Utc), now_utc));

    srs.due_at = due_at.with_timezone(&Utc);
    // Whole-day distance from today to the chosen due date; negative when
    // the client picked a date in the past.
    srs.interval_days = (due_at.date_naive() - now_utc.date_naive()).num_days();
    srs.last_reviewed_at = now_utc;
    if is_right {
        srs.repetitions += 1;
    } else {
        srs.lapses += 1;
    }
    store.put_srs(user_id, &srs)?;

    let next_card = store
        .due_cards(user_id, deck_id, now)?
        .into_iter()
        .find(|c| c.id != card_id);

    let next_card = match next_card {
        Some(card) => {
            let state = srs_view(store.get_srs(user_id, card.id)?.as_ref());
            Some(NextCard {
                id: card.id,
                front_text: card.front_text,
                back_text: card.back_text,
                due_at: state.due_at,
                step: state.step,
            })
        }
        None => None,
    };

    Ok(ReviewAnswerResponse {
        ok: true,
        next_card,
    })
}

/// [`record_answer`] over a raw request body
///
/// An unparseable body is a 400-equivalent [`StudyError::InvalidBody`]
/// with no state touched.
pub fn record_answer_json(
    store: &CardStore,
    clock: &dyn Clock,
    user_id: Uuid,
    deck_id: Uuid,
    body: &str,
) -> Result<ReviewAnswerResponse> {
    let body: ReviewAnswerBody =
        serde_json::from_str(body).map_err(|_| StudyError::InvalidBody)?;
    record_answer(store, clock, user_id, deck_id, &body)
}

/// Per-deck card counts for the deck dashboard
#[derive(Debug, Serialize)]
pub struct DeckOverview {
    pub deck: Deck,
    /// Active cards in the deck, regardless of due-ness
    pub total_cards: usize,
    /// Active cards due today or never scheduled
    pub today_cards: usize,
}

/// Non-archived decks of a user with due/total card counts, ascending by
/// deck creation time
pub fn deck_overview(
    store: &CardStore,
    clock: &dyn Clock,
    user_id: Uuid,
) -> Result<Vec<DeckOverview>> {
    let now = clock.now();

    let mut decks = store.list_decks(user_id)?;
    decks.retain(|d| !d.is_archived);
    decks.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut overview = Vec::with_capacity(decks.len());
    for deck in decks {
        let total_cards = store.active_card_count(user_id, deck.id)?;
        let today_cards = store.due_count(user_id, deck.id, now)?;
        overview.push(DeckOverview {
            deck,
            total_cards,
            today_cards,
        });
    }

    Ok(overview)
}
