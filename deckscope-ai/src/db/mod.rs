//! Database access for deckscope-ai
//!
//! SQLite via sqlx. Decks, cards and tokens are written by other services
//! (or the test helpers); this service reads them and owns `deck_analyses`.

pub mod decks;
pub mod tokens;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{Board, Deck, DeckCard, PersistedAnalysis};

pub use decks::SqliteDeckStore;
pub use tokens::SqliteIdentityProvider;

/// Storage collaborator errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Row exists but cannot be decoded
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Storage seam used by the analysis pipeline
#[async_trait]
pub trait DeckStore: Send + Sync {
    /// Deck header by id
    async fn find_deck(&self, deck_id: &str) -> Result<Option<Deck>, StoreError>;

    /// Cards of one board, ordered by position (single read)
    async fn load_cards(&self, deck_id: &str, board: Board) -> Result<Vec<DeckCard>, StoreError>;

    /// Insert or wholesale-replace the deck's analysis, only if `owner_id`
    /// still owns the deck at write time
    ///
    /// Returns `false` when the ownership condition did not hold (nothing
    /// written).
    async fn replace_analysis(
        &self,
        owner_id: &str,
        analysis: &PersistedAnalysis,
    ) -> Result<bool, StoreError>;

    /// Stored analysis for a deck, if any
    async fn load_analysis(&self, deck_id: &str) -> Result<Option<PersistedAnalysis>, StoreError>;
}

/// Initialize database connection pool
///
/// Creates the database file and parent directory if missing.
pub async fn init_database_pool(db_path: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)?.foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory pool (tests and throwaway runs)
///
/// One connection only: every new SQLite memory connection is a separate
/// empty database.
pub async fn init_memory_pool() -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create service tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS decks (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL,
            format TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS deck_cards (
            deck_id TEXT NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 1,
            board TEXT NOT NULL DEFAULT 'main',
            mana_value REAL,
            type_line TEXT,
            colors TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (deck_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS deck_analyses (
            deck_id TEXT PRIMARY KEY REFERENCES decks(id) ON DELETE CASCADE,
            result TEXT NOT NULL,
            schema_version TEXT NOT NULL,
            model TEXT NOT NULL,
            generated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_tokens (
            token_hash TEXT PRIMARY KEY,
            principal_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            revoked_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (decks, deck_cards, deck_analyses, api_tokens)");

    Ok(())
}
