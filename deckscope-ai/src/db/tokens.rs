//! API token storage and identity resolution
//!
//! Only SHA-256 digests of tokens are stored (see
//! `deckscope_common::api::auth::hash_token`).

use async_trait::async_trait;
use deckscope_common::api::auth::{hash_token, is_well_formed};
use sqlx::SqlitePool;

use super::StoreError;
use crate::models::Principal;
use crate::services::access_guard::IdentityProvider;

/// Token-table backed [`IdentityProvider`]
#[derive(Clone)]
pub struct SqliteIdentityProvider {
    pool: SqlitePool,
}

impl SqliteIdentityProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for SqliteIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Option<Principal>, StoreError> {
        if !is_well_formed(token) {
            return Ok(None);
        }

        let principal_id: Option<String> = sqlx::query_scalar(
            "SELECT principal_id FROM api_tokens WHERE token_hash = ? AND revoked_at IS NULL",
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal_id.map(Principal::new))
    }
}

/// Register a token for a principal
pub async fn issue_token(pool: &SqlitePool, principal_id: &str, token: &str) -> Result<(), StoreError> {
    if !is_well_formed(token) {
        return Err(StoreError::Corrupt("Token is too short or contains whitespace".to_string()));
    }

    sqlx::query("INSERT INTO api_tokens (token_hash, principal_id, created_at) VALUES (?, ?, ?)")
        .bind(hash_token(token))
        .bind(principal_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(())
}

/// Revoke a token; returns false if it was unknown or already revoked
pub async fn revoke_token(pool: &SqlitePool, token: &str) -> Result<bool, StoreError> {
    let outcome = sqlx::query(
        "UPDATE api_tokens SET revoked_at = ? WHERE token_hash = ? AND revoked_at IS NULL",
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(hash_token(token))
    .execute(pool)
    .await?;
    Ok(outcome.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;

    #[tokio::test]
    async fn test_issue_resolve_revoke() {
        let pool = init_memory_pool().await.unwrap();
        issue_token(&pool, "U1", "tok_user_one_0001").await.unwrap();

        let provider = SqliteIdentityProvider::new(pool.clone());
        assert_eq!(
            provider.resolve("tok_user_one_0001").await.unwrap(),
            Some(Principal::new("U1"))
        );
        assert_eq!(provider.resolve("tok_unknown_00000").await.unwrap(), None);

        assert!(revoke_token(&pool, "tok_user_one_0001").await.unwrap());
        assert_eq!(provider.resolve("tok_user_one_0001").await.unwrap(), None);
        assert!(!revoke_token(&pool, "tok_user_one_0001").await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_token_never_queries() {
        let pool = init_memory_pool().await.unwrap();
        let provider = SqliteIdentityProvider::new(pool);
        assert_eq!(provider.resolve("short").await.unwrap(), None);
    }
}
