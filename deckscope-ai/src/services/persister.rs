//! Persister
//!
//! Writes a normalized analysis back to the deck. The ownership re-check and
//! the write are one conditional statement in the store, so a deck
//! transferred mid-run is never written under its old owner.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::db::DeckStore;
use crate::error::AnalysisError;
use crate::models::{DeckAnalysis, PersistedAnalysis, Principal, SCHEMA_VERSION};

pub struct Persister {
    store: Arc<dyn DeckStore>,
}

impl Persister {
    pub fn new(store: Arc<dyn DeckStore>) -> Self {
        Self { store }
    }

    /// Stamp version and time, then insert or replace the deck's analysis
    pub async fn persist(
        &self,
        principal: &Principal,
        deck_id: &str,
        model: &str,
        analysis: DeckAnalysis,
    ) -> Result<PersistedAnalysis, AnalysisError> {
        let record = PersistedAnalysis {
            deck_id: deck_id.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            model: model.to_string(),
            generated_at: Utc::now(),
            result: analysis,
        };

        let written = self
            .store
            .replace_analysis(&principal.id, &record)
            .await
            .map_err(|e| AnalysisError::storage(e.to_string()))?;

        if !written {
            return Err(AnalysisError::not_owner(deck_id));
        }

        info!(deck_id, model, "Analysis persisted");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{decks, init_memory_pool, SqliteDeckStore};
    use crate::models::Deck;

    #[tokio::test]
    async fn test_transfer_before_write_is_not_owner() {
        let pool = init_memory_pool().await.unwrap();
        decks::insert_deck(
            &pool,
            &Deck {
                id: "D1".to_string(),
                owner_id: "U1".to_string(),
                name: "Mono Red".to_string(),
                format: None,
            },
        )
        .await
        .unwrap();

        let store = Arc::new(SqliteDeckStore::new(pool.clone()));
        let persister = Persister::new(store.clone());
        let u1 = Principal::new("U1");

        let first = persister
            .persist(&u1, "D1", "m", DeckAnalysis::default())
            .await
            .unwrap();
        assert_eq!(first.schema_version, SCHEMA_VERSION);

        decks::set_owner(&pool, "D1", "U2").await.unwrap();
        let err = persister
            .persist(&u1, "D1", "m", DeckAnalysis { power_level: 9, ..DeckAnalysis::default() })
            .await
            .unwrap_err();
        assert_eq!(err, AnalysisError::not_owner("D1"));

        let stored = store.load_analysis("D1").await.unwrap().unwrap();
        assert_eq!(stored.result.power_level, first.result.power_level);
    }
}
