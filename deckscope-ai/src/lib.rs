//! deckscope-ai library interface
//!
//! Deck analysis service: authorizes the caller, compresses the deck into a
//! bounded prompt, asks a generative model for a structured assessment,
//! repairs the answer into a strict schema and stores it.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod models;
pub mod services;

pub use crate::error::{AnalysisError, ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::db::DeckStore;
use crate::services::AnalysisPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    /// Read access for stored analyses
    pub store: Arc<dyn DeckStore>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Arc<AnalysisPipeline>, store: Arc<dyn DeckStore>) -> Self {
        Self {
            pipeline,
            store,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analysis_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
