//! Data models for deckscope-ai

pub mod analysis;
pub mod deck;
pub mod schema;

pub use analysis::{DeckAnalysis, Level, PersistedAnalysis, ANALYSIS_SCHEMA, SCHEMA_VERSION};
pub use deck::{Board, Deck, DeckCard, DeckSnapshot, Principal};
pub use schema::{FieldKind, FieldSpec};
