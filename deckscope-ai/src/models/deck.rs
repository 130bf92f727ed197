//! Deck records as read from storage
//!
//! Decks and cards are owned by other services; this crate only reads them.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Authenticated caller, resolved per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Deck header row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub format: Option<String>,
}

impl Deck {
    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        self.owner_id == principal.id
    }
}

/// Deck partition a card belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    Main,
    Side,
    Maybe,
}

impl Board {
    pub fn as_str(self) -> &'static str {
        match self {
            Board::Main => "main",
            Board::Side => "side",
            Board::Maybe => "maybe",
        }
    }
}

impl FromStr for Board {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "mainboard" => Ok(Board::Main),
            "side" | "sideboard" => Ok(Board::Side),
            "maybe" | "maybeboard" => Ok(Board::Maybe),
            other => Err(format!("Unknown board: {}", other)),
        }
    }
}

/// One card line of a deck
///
/// `position` is the stable priority key: lower positions matter more and
/// are the last to be dropped when a prompt must be truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckCard {
    pub position: u32,
    pub name: String,
    pub quantity: u32,
    pub board: Board,
    pub mana_value: Option<f64>,
    pub type_line: Option<String>,
    /// Colour identity letters, e.g. "WU"
    pub colors: String,
}

impl DeckCard {
    pub fn is_land(&self) -> bool {
        self.type_line
            .as_deref()
            .map(|t| t.split_whitespace().any(|w| w.eq_ignore_ascii_case("land")))
            .unwrap_or(false)
    }
}

/// Deck plus the cards analyzed downstream (main board only, by position)
#[derive(Debug, Clone, PartialEq)]
pub struct DeckSnapshot {
    pub deck: Deck,
    pub cards: Vec<DeckCard>,
}

impl DeckSnapshot {
    /// Sum of card quantities
    pub fn card_count(&self) -> u32 {
        self.cards
            .iter()
            .fold(0u32, |count, c| count.saturating_add(c.quantity))
    }
}
