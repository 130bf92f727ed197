//! Access Guard
//!
//! Resolves the caller from a bearer token and checks that the caller owns
//! the deck being analyzed. The `Deck` value returned here is the one the
//! rest of the pipeline works with.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::{DeckStore, StoreError};
use crate::error::AnalysisError;
use crate::models::{Deck, Principal};

/// Token-to-principal resolution
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the token is unknown, revoked or malformed
    async fn resolve(&self, token: &str) -> Result<Option<Principal>, StoreError>;
}

/// Authentication plus ownership check
pub struct AccessGuard {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DeckStore>,
}

impl AccessGuard {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DeckStore>) -> Self {
        Self { identity, store }
    }

    /// Resolve the principal behind `token` and load the deck it must own
    ///
    /// Caller faults are checked in order: missing or unresolvable
    /// credentials, unknown deck, foreign deck.
    pub async fn authorize(
        &self,
        token: Option<&str>,
        deck_id: &str,
    ) -> Result<(Principal, Deck), AnalysisError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(AnalysisError::unauthenticated)?;

        let principal = self
            .identity
            .resolve(token)
            .await
            .map_err(|e| {
                warn!(error = %e, "Identity provider failed");
                AnalysisError::storage(e.to_string())
            })?
            .ok_or_else(AnalysisError::unauthenticated)?;

        let deck = self
            .store
            .find_deck(deck_id)
            .await
            .map_err(|e| AnalysisError::load(e.to_string()))?
            .ok_or_else(|| AnalysisError::not_found(deck_id))?;

        if !deck.is_owned_by(&principal) {
            debug!(deck_id, principal = %principal.id, "Ownership check failed");
            return Err(AnalysisError::not_owner(deck_id));
        }

        Ok((principal, deck))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{decks, init_memory_pool, tokens, SqliteDeckStore, SqliteIdentityProvider};

    async fn guard() -> AccessGuard {
        let pool = init_memory_pool().await.unwrap();
        decks::insert_deck(
            &pool,
            &Deck {
                id: "D1".to_string(),
                owner_id: "U1".to_string(),
                name: "Elves".to_string(),
                format: None,
            },
        )
        .await
        .unwrap();
        tokens::issue_token(&pool, "U1", "tok_user_one_0001").await.unwrap();
        tokens::issue_token(&pool, "U2", "tok_user_two_0002").await.unwrap();

        AccessGuard::new(
            Arc::new(SqliteIdentityProvider::new(pool.clone())),
            Arc::new(SqliteDeckStore::new(pool)),
        )
    }

    #[tokio::test]
    async fn test_owner_is_authorized() {
        let (principal, deck) = guard()
            .await
            .authorize(Some("tok_user_one_0001"), "D1")
            .await
            .unwrap();
        assert_eq!(principal.id, "U1");
        assert_eq!(deck.id, "D1");
    }

    #[tokio::test]
    async fn test_caller_faults() {
        let guard = guard().await;
        assert_eq!(
            guard.authorize(None, "D1").await.unwrap_err(),
            AnalysisError::unauthenticated()
        );
        assert_eq!(
            guard.authorize(Some("   "), "D1").await.unwrap_err(),
            AnalysisError::unauthenticated()
        );
        assert_eq!(
            guard.authorize(Some("tok_revoked_or_unknown"), "D1").await.unwrap_err(),
            AnalysisError::unauthenticated()
        );
        assert_eq!(
            guard.authorize(Some("tok_user_two_0002"), "D1").await.unwrap_err(),
            AnalysisError::not_owner("D1")
        );
        assert_eq!(
            guard.authorize(Some("tok_user_two_0002"), "D404").await.unwrap_err(),
            AnalysisError::not_found("D404")
        );
    }
}
