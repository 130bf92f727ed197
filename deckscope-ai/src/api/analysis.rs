//! Non-streaming analysis endpoints
//!
//! `POST` runs the same pipeline as the SSE stream and answers once with the
//! final outcome. `GET` returns the stored analysis of an owned deck.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::warn;

use super::credentials::Credentials;
use super::sse::analysis_stream;
use crate::error::{ApiError, ApiResult};
use crate::models::{DeckAnalysis, PersistedAnalysis};
use crate::services::analysis_pipeline::{CollectingSink, RunOutcome};
use crate::AppState;

/// Successful analysis response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub ok: bool,
    pub target_id: String,
    pub result: DeckAnalysis,
}

/// POST /api/decks/:deck_id/analysis
pub async fn run_analysis(
    State(state): State<AppState>,
    Path(deck_id): Path<String>,
    credentials: Credentials,
) -> ApiResult<Json<AnalysisResponse>> {
    let mut sink = CollectingSink::default();

    match state.pipeline.run(credentials.token(), &deck_id, &mut sink).await {
        RunOutcome::Completed(persisted) => Ok(Json(AnalysisResponse {
            ok: true,
            target_id: persisted.deck_id,
            result: persisted.result,
        })),
        RunOutcome::Failed(err) => Err(err.into()),
        RunOutcome::Disconnected => {
            Err(ApiError::Internal("Analysis ended without an outcome".to_string()))
        }
    }
}

/// GET /api/decks/:deck_id/analysis
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(deck_id): Path<String>,
    credentials: Credentials,
) -> ApiResult<Json<PersistedAnalysis>> {
    state
        .pipeline
        .access_guard()
        .authorize(credentials.token(), &deck_id)
        .await?;

    let stored = state.store.load_analysis(&deck_id).await.map_err(|e| {
        warn!(deck_id = %deck_id, error = %e, "Failed to read stored analysis");
        ApiError::Internal(e.to_string())
    })?;

    stored
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No analysis for deck {}", deck_id)))
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/decks/:deck_id/analysis",
            get(get_analysis).post(run_analysis),
        )
        .route("/api/decks/:deck_id/analysis/stream", get(analysis_stream))
}
