//! Storage operations for decks, cards and scheduling records
//!
//! Directory structure per user:
//! ```text
//! {base}/users/{user-id}/
//! ├── decks.json            # Array of all decks
//! ├── cards/
//! │   └── {card-id}.json    # Individual card files
//! ├── srs/
//! │   └── {card-id}.json    # Scheduling record, absent until first answer
//! └── sessions/
//!     └── {session-id}.json # Review session audit records
//! ```
//!
//! Everything is scoped under the owning user's directory, so a lookup
//! with the wrong user resolves to "not found" rather than revealing
//! another user's records.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::end_of_day;
use crate::models::{Card, CardSrs, CardStatus, Deck, ReviewSession};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deck not found: {0}")]
    DeckNotFound(Uuid),

    #[error("Card not found: {0}")]
    CardNotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage manager for scheduler persistence
pub struct CardStore {
    /// Base data path (e.g. ~/.local/share/cardbox)
    base_path: PathBuf,
}

impl CardStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the directory holding a user's decks, cards and records
    fn user_dir(&self, user_id: Uuid) -> PathBuf {
        self.base_path.join("users").join(user_id.to_string())
    }

    /// Get the decks.json path for a user
    fn decks_path(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join("decks.json")
    }

    /// Get the cards directory for a user
    fn cards_dir(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join("cards")
    }

    /// Get the path for a specific card
    fn card_path(&self, user_id: Uuid, card_id: Uuid) -> PathBuf {
        self.cards_dir(user_id).join(format!("{}.json", card_id))
    }

    /// Get the scheduling-records directory for a user
    fn srs_dir(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join("srs")
    }

    /// Get the path for a card's scheduling record
    fn srs_path(&self, user_id: Uuid, card_id: Uuid) -> PathBuf {
        self.srs_dir(user_id).join(format!("{}.json", card_id))
    }

    /// Get the review-sessions directory for a user
    fn sessions_dir(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join("sessions")
    }

    /// Initialize storage for a user
    pub fn init(&self, user_id: Uuid) -> Result<()> {
        fs::create_dir_all(self.user_dir(user_id))?;
        fs::create_dir_all(self.cards_dir(user_id))?;
        fs::create_dir_all(self.srs_dir(user_id))?;
        fs::create_dir_all(self.sessions_dir(user_id))?;

        let decks_path = self.decks_path(user_id);
        if !decks_path.exists() {
            let empty_decks: Vec<Deck> = Vec::new();
            fs::write(&decks_path, serde_json::to_string_pretty(&empty_decks)?)?;
        }

        Ok(())
    }

    // ==================== Deck Operations ====================

    /// List all decks belonging to a user
    pub fn list_decks(&self, user_id: Uuid) -> Result<Vec<Deck>> {
        let decks_path = self.decks_path(user_id);
        if !decks_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&decks_path)?;
        let decks: Vec<Deck> = serde_json::from_str(&content)?;
        Ok(decks)
    }

    /// Get a specific deck owned by the user
    pub fn get_deck(&self, user_id: Uuid, deck_id: Uuid) -> Result<Deck> {
        let decks = self.list_decks(user_id)?;
        decks
            .into_iter()
            .find(|d| d.id == deck_id)
            .ok_or(StorageError::DeckNotFound(deck_id))
    }

    /// Create a new deck for the user
    pub fn create_deck(&self, user_id: Uuid, title: String, now: DateTime<Utc>) -> Result<Deck> {
        self.init(user_id)?;

        let deck = Deck::new(user_id, title, now);

        let mut decks = self.list_decks(user_id)?;
        decks.push(deck.clone());
        fs::write(
            self.decks_path(user_id),
            serde_json::to_string_pretty(&decks)?,
        )?;

        Ok(deck)
    }

    /// Delete a deck together with its cards and their scheduling records
    pub fn delete_deck(&self, user_id: Uuid, deck_id: Uuid) -> Result<()> {
        // Missing decks surface as DeckNotFound before any cascade work.
        self.get_deck(user_id, deck_id)?;

        for card in self.list_cards(user_id, deck_id)? {
            self.delete_card(user_id, card.id)?;
        }

        let mut decks = self.list_decks(user_id)?;
        decks.retain(|d| d.id != deck_id);
        fs::write(
            self.decks_path(user_id),
            serde_json::to_string_pretty(&decks)?,
        )?;

        Ok(())
    }

    // ==================== Card Operations ====================

    /// List the cards of a deck, ascending by creation time
    ///
    /// Ties on the creation timestamp fall back to the insertion counter,
    /// so the order is stable across calls.
    pub fn list_cards(&self, user_id: Uuid, deck_id: Uuid) -> Result<Vec<Card>> {
        let cards_dir = self.cards_dir(user_id);
        if !cards_dir.exists() {
            return Ok(Vec::new());
        }

        let mut cards = Vec::new();
        for entry in fs::read_dir(&cards_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                let card: Card = serde_json::from_str(&content)?;
                if card.deck_id == deck_id {
                    cards.push(card);
                }
            }
        }

        cards.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.position.cmp(&b.position))
        });
        Ok(cards)
    }

    /// Get a specific card owned by the user
    pub fn get_card(&self, user_id: Uuid, card_id: Uuid) -> Result<Card> {
        let card_path = self.card_path(user_id, card_id);
        if !card_path.exists() {
            return Err(StorageError::CardNotFound(card_id));
        }

        let content = fs::read_to_string(&card_path)?;
        let card: Card = serde_json::from_str(&content)?;
        Ok(card)
    }

    /// Create a new card in a deck
    pub fn create_card(
        &self,
        user_id: Uuid,
        deck_id: Uuid,
        front_text: String,
        back_text: String,
        now: DateTime<Utc>,
    ) -> Result<Card> {
        self.get_deck(user_id, deck_id)?;
        self.init(user_id)?;

        let mut card = Card::new(deck_id, front_text, back_text, now);
        card.position = self.list_cards(user_id, deck_id)?.len() as i32;

        fs::write(
            self.card_path(user_id, card.id),
            serde_json::to_string_pretty(&card)?,
        )?;

        Ok(card)
    }

    /// Archive a card, removing it from listings and study
    pub fn archive_card(&self, user_id: Uuid, card_id: Uuid) -> Result<Card> {
        let mut card = self.get_card(user_id, card_id)?;
        card.status = CardStatus::Archived;

        fs::write(
            self.card_path(user_id, card_id),
            serde_json::to_string_pretty(&card)?,
        )?;

        Ok(card)
    }

    /// Delete a card and its scheduling record
    pub fn delete_card(&self, user_id: Uuid, card_id: Uuid) -> Result<()> {
        self.get_card(user_id, card_id)?;

        fs::remove_file(self.card_path(user_id, card_id))?;

        let srs_path = self.srs_path(user_id, card_id);
        if srs_path.exists() {
            fs::remove_file(&srs_path)?;
        }

        Ok(())
    }

    // ==================== Scheduling Records ====================

    /// Get the scheduling record for a card, `None` if it was never answered
    pub fn get_srs(&self, user_id: Uuid, card_id: Uuid) -> Result<Option<CardSrs>> {
        let srs_path = self.srs_path(user_id, card_id);
        if !srs_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&srs_path)?;
        let srs: CardSrs = serde_json::from_str(&content)?;
        Ok(Some(srs))
    }

    /// Write a card's scheduling record
    pub fn put_srs(&self, user_id: Uuid, srs: &CardSrs) -> Result<()> {
        fs::write(
            self.srs_path(user_id, srs.card_id),
            serde_json::to_string_pretty(srs)?,
        )?;
        Ok(())
    }

    // ==================== Review Sessions ====================

    /// Persist a review-session audit record
    pub fn create_session(
        &self,
        user_id: Uuid,
        mode: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReviewSession> {
        let session = ReviewSession::new(user_id, mode, now);

        fs::write(
            self.sessions_dir(user_id)
                .join(format!("{}.json", session.id)),
            serde_json::to_string_pretty(&session)?,
        )?;

        Ok(session)
    }

    // ==================== Due Queries ====================

    /// Active cards of a deck that are due on the day of `as_of`
    ///
    /// A card is due when it has no scheduling record yet, or when its
    /// `due_at` is no later than the end of `as_of`'s calendar day.
    /// Ordered ascending by creation time.
    pub fn due_cards(
        &self,
        user_id: Uuid,
        deck_id: Uuid,
        as_of: DateTime<FixedOffset>,
    ) -> Result<Vec<Card>> {
        let horizon = end_of_day(as_of).with_timezone(&Utc);

        let mut due = Vec::new();
        for card in self.list_cards(user_id, deck_id)? {
            if card.status != CardStatus::Active {
                continue;
            }
            match self.get_srs(user_id, card.id)? {
                None => due.push(card),
                Some(srs) if srs.due_at <= horizon => due.push(card),
                Some(_) => {}
            }
        }

        Ok(due)
    }

    /// Count-only variant of [`CardStore::due_cards`] for dashboards
    pub fn due_count(
        &self,
        user_id: Uuid,
        deck_id: Uuid,
        as_of: DateTime<FixedOffset>,
    ) -> Result<usize> {
        Ok(self.due_cards(user_id, deck_id, as_of)?.len())
    }

    /// Number of active cards in a deck, regardless of due-ness
    pub fn active_card_count(&self, user_id: Uuid, deck_id: Uuid) -> Result<usize> {
        Ok(self
            .list_cards(user_id, deck_id)?
            .iter()
            .filter(|c| c.status == CardStatus::Active)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, CardStore, Uuid) {
        let dir = TempDir::new().unwrap();
        let store = CardStore::new(dir.path().to_path_buf());
        let user_id = Uuid::new_v4();
        store.init(user_id).unwrap();
        (dir, store, user_id)
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn local(s: &str) -> DateTime<FixedOffset> {
        s.parse().unwrap()
    }

    #[test]
    fn test_unscheduled_cards_always_due() {
        let (_dir, store, user_id) = test_store();
        let now = utc("2030-01-01T08:00:00Z");
        let deck = store.create_deck(user_id, "Kanji".into(), now).unwrap();
        store
            .create_card(user_id, deck.id, "火".into(), "fire".into(), now)
            .unwrap();

        // Far in the future and far in the past alike.
        for as_of in ["2050-06-01T10:00:00+00:00", "2001-06-01T10:00:00+00:00"] {
            let due = store.due_cards(user_id, deck.id, local(as_of)).unwrap();
            assert_eq!(due.len(), 1);
        }
    }

    #[test]
    fn test_due_boundary_is_end_of_day() {
        let (_dir, store, user_id) = test_store();
        let now = utc("2030-01-01T08:00:00Z");
        let deck = store.create_deck(user_id, "Kanji".into(), now).unwrap();
        let card = store
            .create_card(user_id, deck.id, "水".into(), "water".into(), now)
            .unwrap();

        let as_of = local("2030-01-01T08:00:00+00:00");
        let eod = utc("2030-01-01T23:59:59.999999Z");

        let mut srs = CardSrs::new(card.id, eod, now);
        store.put_srs(user_id, &srs).unwrap();
        assert_eq!(store.due_count(user_id, deck.id, as_of).unwrap(), 1);

        srs.due_at = eod + Duration::microseconds(1);
        store.put_srs(user_id, &srs).unwrap();
        assert_eq!(store.due_count(user_id, deck.id, as_of).unwrap(), 0);
    }

    #[test]
    fn test_ordering_by_creation_time_is_stable() {
        let (_dir, store, user_id) = test_store();
        let now = utc("2030-01-01T08:00:00Z");
        let deck = store.create_deck(user_id, "Kanji".into(), now).unwrap();

        // Identical creation timestamps: insertion order must break the tie.
        let first = store
            .create_card(user_id, deck.id, "a".into(), "1".into(), now)
            .unwrap();
        let second = store
            .create_card(user_id, deck.id, "b".into(), "2".into(), now)
            .unwrap();
        let third = store
            .create_card(user_id, deck.id, "c".into(), "3".into(), now + Duration::seconds(5))
            .unwrap();

        let as_of = local("2030-01-01T09:00:00+00:00");
        for _ in 0..3 {
            let due = store.due_cards(user_id, deck.id, as_of).unwrap();
            let ids: Vec<Uuid> = due.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![first.id, second.id, third.id]);
        }
    }

    #[test]
    fn test_archived_cards_never_due() {
        let (_dir, store, user_id) = test_store();
        let now = utc("2030-01-01T08:00:00Z");
        let deck = store.create_deck(user_id, "Kanji".into(), now).unwrap();
        let card = store
            .create_card(user_id, deck.id, "木".into(), "tree".into(), now)
            .unwrap();

        store.archive_card(user_id, card.id).unwrap();

        let as_of = local("2030-01-01T09:00:00+00:00");
        assert_eq!(store.due_count(user_id, deck.id, as_of).unwrap(), 0);
        assert_eq!(store.active_card_count(user_id, deck.id).unwrap(), 0);
    }

    #[test]
    fn test_srs_absent_until_written() {
        let (_dir, store, user_id) = test_store();
        let now = utc("2030-01-01T08:00:00Z");
        let deck = store.create_deck(user_id, "Kanji".into(), now).unwrap();
        let card = store
            .create_card(user_id, deck.id, "金".into(), "gold".into(), now)
            .unwrap();

        assert!(store.get_srs(user_id, card.id).unwrap().is_none());

        let srs = CardSrs::new(card.id, now, now);
        store.put_srs(user_id, &srs).unwrap();
        assert!(store.get_srs(user_id, card.id).unwrap().is_some());
    }

    #[test]
    fn test_delete_deck_cascades() {
        let (_dir, store, user_id) = test_store();
        let now = utc("2030-01-01T08:00:00Z");
        let deck = store.create_deck(user_id, "Kanji".into(), now).unwrap();
        let card = store
            .create_card(user_id, deck.id, "土".into(), "earth".into(), now)
            .unwrap();
        store
            .put_srs(user_id, &CardSrs::new(card.id, now, now))
            .unwrap();

        store.delete_deck(user_id, deck.id).unwrap();

        assert!(matches!(
            store.get_deck(user_id, deck.id),
            Err(StorageError::DeckNotFound(_))
        ));
        assert!(matches!(
            store.get_card(user_id, card.id),
            Err(StorageError::CardNotFound(_))
        ));
        assert!(store.get_srs(user_id, card.id).unwrap().is_none());
    }

    #[test]
    fn test_records_are_user_scoped() {
        let (_dir, store, user_id) = test_store();
        let now = utc("2030-01-01T08:00:00Z");
        let deck = store.create_deck(user_id, "Kanji".into(), now).unwrap();
        let card = store
            .create_card(user_id, deck.id, "日".into(), "sun".into(), now)
            .unwrap();

        let stranger = Uuid::new_v4();
        assert!(matches!(
            store.get_deck(stranger, deck.id),
            Err(StorageError::DeckNotFound(_))
        ));
        assert!(matches!(
            store.get_card(stranger, card.id),
            Err(StorageError::CardNotFound(_))
        ));
    }
}
