//! # deckscope Common Library
//!
//! Shared code for the deckscope services including:
//! - Common error type
//! - Analysis event types (the SSE wire vocabulary)
//! - SSE helpers (event encoding, heartbeat task)
//! - Bootstrap configuration loading
//! - Bearer-token hashing

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
