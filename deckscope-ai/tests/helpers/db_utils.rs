//! Database seeding for integration tests

use deckscope_ai::db::{decks, init_memory_pool, tokens};
use deckscope_ai::models::{Board, Deck, DeckCard};
use sqlx::SqlitePool;

/// Deck D1 owned by U1 with a small main board
pub const OWNED_DECK: &str = "D1";
/// Deck D2 owned by U1 with sideboard cards only
pub const EMPTY_DECK: &str = "D2";

pub const U1_TOKEN: &str = "tok_user_one_0001";
pub const U2_TOKEN: &str = "tok_user_two_0002";

pub async fn create_test_db() -> SqlitePool {
    init_memory_pool().await.expect("in-memory database")
}

fn deck(id: &str, owner: &str, name: &str) -> Deck {
    Deck {
        id: id.to_string(),
        owner_id: owner.to_string(),
        name: name.to_string(),
        format: Some("modern".to_string()),
    }
}

fn card(position: u32, name: &str, qty: u32, board: Board, mv: f64, type_line: &str, colors: &str) -> DeckCard {
    DeckCard {
        position,
        name: name.to_string(),
        quantity: qty,
        board,
        mana_value: Some(mv),
        type_line: Some(type_line.to_string()),
        colors: colors.to_string(),
    }
}

/// D1 (U1, mono-red burn), D2 (U1, sideboard only), tokens for U1 and U2
pub async fn seed_standard_decks(pool: &SqlitePool) {
    decks::insert_deck(pool, &deck(OWNED_DECK, "U1", "Mono Red Burn")).await.unwrap();
    decks::insert_cards(
        pool,
        OWNED_DECK,
        &[
            card(0, "Lightning Bolt", 4, Board::Main, 1.0, "Instant", "R"),
            card(1, "Goblin Guide", 4, Board::Main, 1.0, "Creature — Goblin Scout", "R"),
            card(2, "Lava Spike", 4, Board::Main, 1.0, "Sorcery — Arcane", "R"),
            card(3, "Mountain", 18, Board::Main, 0.0, "Basic Land — Mountain", ""),
            card(4, "Smash to Smithereens", 3, Board::Side, 2.0, "Instant", "R"),
        ],
    )
    .await
    .unwrap();

    decks::insert_deck(pool, &deck(EMPTY_DECK, "U1", "Brewing")).await.unwrap();
    decks::insert_cards(
        pool,
        EMPTY_DECK,
        &[card(0, "Pyroblast", 2, Board::Side, 1.0, "Instant", "R")],
    )
    .await
    .unwrap();

    tokens::issue_token(pool, "U1", U1_TOKEN).await.unwrap();
    tokens::issue_token(pool, "U2", U2_TOKEN).await.unwrap();
}

/// `count` distinct main-board cards with long names
pub fn big_deck_cards(count: u32) -> Vec<DeckCard> {
    (0..count)
        .map(|i| {
            card(
                i,
                &format!("Generated Card {:04} of the Very Long Name Series", i),
                1,
                Board::Main,
                f64::from(i % 8),
                "Creature — Human Wizard",
                "U",
            )
        })
        .collect()
}

/// Raw stored JSON text of a deck's analysis (byte-level comparisons)
pub async fn stored_result_text(pool: &SqlitePool, deck_id: &str) -> Option<String> {
    sqlx::query_scalar("SELECT result || '|' || generated_at FROM deck_analyses WHERE deck_id = ?")
        .bind(deck_id)
        .fetch_optional(pool)
        .await
        .unwrap()
}
