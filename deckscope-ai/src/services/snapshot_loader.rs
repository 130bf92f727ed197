//! Snapshot Loader
//!
//! Reads the analyzed subset of a deck (main board, by position) in a single
//! query so the pipeline works on one consistent view.

use std::sync::Arc;

use crate::db::DeckStore;
use crate::error::AnalysisError;
use crate::models::{Board, Deck, DeckSnapshot};

pub struct SnapshotLoader {
    store: Arc<dyn DeckStore>,
}

impl SnapshotLoader {
    pub fn new(store: Arc<dyn DeckStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, deck: Deck) -> Result<DeckSnapshot, AnalysisError> {
        let cards = self
            .store
            .load_cards(&deck.id, Board::Main)
            .await
            .map_err(|e| AnalysisError::load(e.to_string()))?;

        if cards.is_empty() {
            return Err(AnalysisError::empty_snapshot(&deck.id));
        }

        Ok(DeckSnapshot { deck, cards })
    }
}
