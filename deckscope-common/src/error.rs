//! Common error types for deckscope

use thiserror::Error;

/// Common result type for deckscope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type across deckscope crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
