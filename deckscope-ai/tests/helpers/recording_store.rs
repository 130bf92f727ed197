//! DeckStore wrapper that counts writes

use async_trait::async_trait;
use deckscope_ai::db::{DeckStore, SqliteDeckStore, StoreError};
use deckscope_ai::models::{Board, Deck, DeckCard, PersistedAnalysis};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicU32, Ordering};

pub struct RecordingStore {
    inner: SqliteDeckStore,
    writes: AtomicU32,
}

impl RecordingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteDeckStore::new(pool),
            writes: AtomicU32::new(0),
        }
    }

    /// Number of `replace_analysis` calls
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeckStore for RecordingStore {
    async fn find_deck(&self, deck_id: &str) -> Result<Option<Deck>, StoreError> {
        self.inner.find_deck(deck_id).await
    }

    async fn load_cards(&self, deck_id: &str, board: Board) -> Result<Vec<DeckCard>, StoreError> {
        self.inner.load_cards(deck_id, board).await
    }

    async fn replace_analysis(
        &self,
        owner_id: &str,
        analysis: &PersistedAnalysis,
    ) -> Result<bool, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.replace_analysis(owner_id, analysis).await
    }

    async fn load_analysis(&self, deck_id: &str) -> Result<Option<PersistedAnalysis>, StoreError> {
        self.inner.load_analysis(deck_id).await
    }
}
