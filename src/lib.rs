//! Spaced-repetition flashcard study scheduler
//!
//! This crate provides:
//! - Deck, card and scheduling-record models with file-backed storage
//! - Due-card selection for a study day
//! - Pass/fail answer processing (counter bookkeeping and rescheduling)
//! - The fixed progression ladder used for step display
//!
//! Rendering, authentication and transport are left to the embedding
//! application: every operation takes an explicit user identity and an
//! injected [`clock::Clock`], so due-date math is deterministic under
//! test and the storage layer never reads global state.

pub mod clock;
pub mod ladder;
pub mod models;
pub mod storage;
pub mod study;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ladder::{step_from_interval, LADDER_DAYS};
pub use models::{Card, CardSrs, CardStatus, Deck, ReviewSession};
pub use storage::{CardStore, StorageError};
pub use study::{
    deck_overview, record_answer, record_answer_json, start_study_session, DeckOverview,
    NextCard, ReviewAnswerBody, ReviewAnswerResponse, StudyError, StudySession,
};
