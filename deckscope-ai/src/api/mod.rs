//! HTTP API handlers for deckscope-ai
//!
//! Deck analysis over SSE and plain JSON, plus the health endpoint.

pub mod analysis;
pub mod credentials;
pub mod health;
pub mod sse;

pub use analysis::analysis_routes;
pub use credentials::Credentials;
pub use health::health_routes;
pub use sse::analysis_stream;
