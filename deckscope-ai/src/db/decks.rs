//! Deck, card and analysis queries

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{DeckStore, StoreError};
use crate::models::{Board, Deck, DeckAnalysis, DeckCard, PersistedAnalysis};

/// sqlx-backed [`DeckStore`]
#[derive(Clone)]
pub struct SqliteDeckStore {
    pool: SqlitePool,
}

impl SqliteDeckStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeckStore for SqliteDeckStore {
    async fn find_deck(&self, deck_id: &str) -> Result<Option<Deck>, StoreError> {
        let row = sqlx::query("SELECT id, owner_id, name, format FROM decks WHERE id = ?")
            .bind(deck_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Deck {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            name: row.get("name"),
            format: row.get("format"),
        }))
    }

    async fn load_cards(&self, deck_id: &str, board: Board) -> Result<Vec<DeckCard>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT position, name, quantity, board, mana_value, type_line, colors
            FROM deck_cards
            WHERE deck_id = ? AND board = ?
            ORDER BY position ASC
            "#,
        )
        .bind(deck_id)
        .bind(board.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let board: String = row.get("board");
                let board = board.parse::<Board>().map_err(StoreError::Corrupt)?;
                Ok(DeckCard {
                    position: column_u32(&row, "position")?,
                    name: row.get("name"),
                    quantity: column_u32(&row, "quantity")?,
                    board,
                    mana_value: row.get("mana_value"),
                    type_line: row.get("type_line"),
                    colors: row.get("colors"),
                })
            })
            .collect()
    }

    async fn replace_analysis(
        &self,
        owner_id: &str,
        analysis: &PersistedAnalysis,
    ) -> Result<bool, StoreError> {
        // Prepare all data before touching the database
        let result = serde_json::to_string(&analysis.result)
            .map_err(|e| StoreError::Corrupt(format!("Failed to serialize analysis: {}", e)))?;
        let generated_at = analysis.generated_at.to_rfc3339();

        // Ownership condition and write are one statement: a concurrent
        // transfer either lands before (0 rows) or after (row written).
        let outcome = sqlx::query(
            r#"
            INSERT INTO deck_analyses (deck_id, result, schema_version, model, generated_at)
            SELECT id, ?, ?, ?, ? FROM decks WHERE id = ? AND owner_id = ?
            ON CONFLICT(deck_id) DO UPDATE SET
                result = excluded.result,
                schema_version = excluded.schema_version,
                model = excluded.model,
                generated_at = excluded.generated_at
            "#,
        )
        .bind(&result)
        .bind(&analysis.schema_version)
        .bind(&analysis.model)
        .bind(&generated_at)
        .bind(&analysis.deck_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() == 1)
    }

    async fn load_analysis(&self, deck_id: &str) -> Result<Option<PersistedAnalysis>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT deck_id, result, schema_version, model, generated_at
            FROM deck_analyses
            WHERE deck_id = ?
            "#,
        )
        .bind(deck_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let result: String = row.get("result");
        let result: DeckAnalysis = serde_json::from_str(&result)
            .map_err(|e| StoreError::Corrupt(format!("Failed to deserialize analysis: {}", e)))?;

        let generated_at: String = row.get("generated_at");
        let generated_at = chrono::DateTime::parse_from_rfc3339(&generated_at)
            .map_err(|e| StoreError::Corrupt(format!("Failed to parse generated_at: {}", e)))?
            .with_timezone(&chrono::Utc);

        Ok(Some(PersistedAnalysis {
            deck_id: row.get("deck_id"),
            schema_version: row.get("schema_version"),
            model: row.get("model"),
            generated_at,
            result,
        }))
    }
}

fn column_u32(row: &SqliteRow, column: &str) -> Result<u32, StoreError> {
    let value: i64 = row.get(column);
    u32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("{} out of range: {}", column, value)))
}

/// Insert a deck header (seeding and tests; deck CRUD lives elsewhere)
pub async fn insert_deck(pool: &SqlitePool, deck: &Deck) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO decks (id, owner_id, name, format, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&deck.id)
        .bind(&deck.owner_id)
        .bind(&deck.name)
        .bind(&deck.format)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert card lines for a deck in one transaction
pub async fn insert_cards(
    pool: &SqlitePool,
    deck_id: &str,
    cards: &[DeckCard],
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;
    for card in cards {
        sqlx::query(
            r#"
            INSERT INTO deck_cards (deck_id, position, name, quantity, board, mana_value, type_line, colors)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(deck_id)
        .bind(card.position as i64)
        .bind(&card.name)
        .bind(card.quantity as i64)
        .bind(card.board.as_str())
        .bind(card.mana_value)
        .bind(&card.type_line)
        .bind(&card.colors)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Change a deck's owner (deck transfer)
pub async fn set_owner(pool: &SqlitePool, deck_id: &str, owner_id: &str) -> Result<bool, StoreError> {
    let outcome = sqlx::query("UPDATE decks SET owner_id = ? WHERE id = ?")
        .bind(owner_id)
        .bind(deck_id)
        .execute(pool)
        .await?;
    Ok(outcome.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;
    use crate::models::SCHEMA_VERSION;

    fn deck(id: &str, owner: &str) -> Deck {
        Deck {
            id: id.to_string(),
            owner_id: owner.to_string(),
            name: "Test deck".to_string(),
            format: Some("commander".to_string()),
        }
    }

    fn card(position: u32, name: &str, board: Board) -> DeckCard {
        DeckCard {
            position,
            name: name.to_string(),
            quantity: 1,
            board,
            mana_value: Some(2.0),
            type_line: Some("Creature — Elf".to_string()),
            colors: "G".to_string(),
        }
    }

    fn persisted(deck_id: &str, summary: &str) -> PersistedAnalysis {
        PersistedAnalysis {
            deck_id: deck_id.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            model: "test-model".to_string(),
            generated_at: chrono::Utc::now(),
            result: DeckAnalysis {
                summary: summary.to_string(),
                ..DeckAnalysis::default()
            },
        }
    }

    #[tokio::test]
    async fn test_load_cards_filters_board_and_orders() {
        let pool = init_memory_pool().await.unwrap();
        insert_deck(&pool, &deck("D1", "U1")).await.unwrap();
        insert_cards(
            &pool,
            "D1",
            &[
                card(2, "Llanowar Elves", Board::Main),
                card(0, "Elvish Mystic", Board::Main),
                card(1, "Naturalize", Board::Side),
            ],
        )
        .await
        .unwrap();

        let store = SqliteDeckStore::new(pool);
        let cards = store.load_cards("D1", Board::Main).await.unwrap();
        let names: Vec<_> = cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Elvish Mystic", "Llanowar Elves"]);
    }

    #[tokio::test]
    async fn test_out_of_range_quantity_is_corrupt() {
        let pool = init_memory_pool().await.unwrap();
        insert_deck(&pool, &deck("D1", "U1")).await.unwrap();
        sqlx::query(
            "INSERT INTO deck_cards (deck_id, position, name, quantity, board) VALUES ('D1', 0, 'Forest', ?, 'main')",
        )
        .bind(5_000_000_000i64)
        .execute(&pool)
        .await
        .unwrap();

        let store = SqliteDeckStore::new(pool);
        let err = store.load_cards("D1", Board::Main).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref msg) if msg.contains("quantity")), "{:?}", err);
    }

    #[tokio::test]
    async fn test_replace_analysis_requires_current_owner() {
        let pool = init_memory_pool().await.unwrap();
        insert_deck(&pool, &deck("D1", "U1")).await.unwrap();
        let store = SqliteDeckStore::new(pool);

        assert!(!store.replace_analysis("U2", &persisted("D1", "intruder")).await.unwrap());
        assert!(store.load_analysis("D1").await.unwrap().is_none());

        assert!(store.replace_analysis("U1", &persisted("D1", "first")).await.unwrap());
        assert!(store.replace_analysis("U1", &persisted("D1", "second")).await.unwrap());

        let stored = store.load_analysis("D1").await.unwrap().unwrap();
        assert_eq!(stored.result.summary, "second");
        assert_eq!(stored.schema_version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_replace_analysis_missing_deck_writes_nothing() {
        let pool = init_memory_pool().await.unwrap();
        let store = SqliteDeckStore::new(pool);
        assert!(!store.replace_analysis("U1", &persisted("nope", "x")).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_owner_transfers_deck() {
        let pool = init_memory_pool().await.unwrap();
        insert_deck(&pool, &deck("D1", "U1")).await.unwrap();
        assert!(set_owner(&pool, "D1", "U2").await.unwrap());

        let store = SqliteDeckStore::new(pool);
        assert_eq!(store.find_deck("D1").await.unwrap().unwrap().owner_id, "U2");
    }
}
