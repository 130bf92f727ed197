//! Test Helper Utilities
//!
//! Shared fixtures for deckscope-ai integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod recording_store;

pub use db_utils::{
    big_deck_cards, create_test_db, seed_standard_decks, stored_result_text, EMPTY_DECK,
    OWNED_DECK, U1_TOKEN, U2_TOKEN,
};
pub use recording_store::RecordingStore;

use deckscope_ai::model::MockModel;
use deckscope_ai::services::analysis_pipeline::{PipelineDeps, PipelineSettings};
use deckscope_ai::services::{AnalysisPipeline, CurveCompressor};
use deckscope_ai::db::SqliteIdentityProvider;
use deckscope_ai::{build_router, AppState};
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Seeded database, recording store, scripted model and pipeline
pub struct TestFixture {
    pub pool: SqlitePool,
    pub store: Arc<RecordingStore>,
    pub model: Arc<MockModel>,
    pub pipeline: Arc<AnalysisPipeline>,
}

impl TestFixture {
    pub fn router(&self) -> Router {
        build_router(AppState::new(self.pipeline.clone(), self.store.clone()))
    }
}

/// Settings with a negligible retry delay and no heartbeat during tests
pub fn fast_settings() -> PipelineSettings {
    let mut settings = PipelineSettings::default();
    settings.invoker.retry_delay = Duration::from_millis(1);
    settings.heartbeat_interval = Duration::from_secs(3600);
    settings
}

pub async fn fixture(model: MockModel) -> TestFixture {
    fixture_with(model, fast_settings()).await
}

pub async fn fixture_with(model: MockModel, settings: PipelineSettings) -> TestFixture {
    let pool = create_test_db().await;
    seed_standard_decks(&pool).await;

    let store = Arc::new(RecordingStore::new(pool.clone()));
    let model = Arc::new(model);
    let pipeline = Arc::new(AnalysisPipeline::new(
        PipelineDeps {
            store: store.clone(),
            identity: Arc::new(SqliteIdentityProvider::new(pool.clone())),
            compressor: Arc::new(CurveCompressor),
            model: model.clone(),
        },
        settings,
    ));

    TestFixture {
        pool,
        store,
        model,
        pipeline,
    }
}
