//! Server-Sent Events stream for deck analysis
//!
//! One request runs one pipeline. Named events: `progress`, `debug` (when
//! enabled), then exactly one of `done` or `error`. A `: keep-alive` comment
//! is interleaved on the configured interval. The response ends when the
//! run has finished; if the client leaves first the run is discarded.

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use deckscope_common::sse::channel_stream;
use futures::stream::Stream;
use std::convert::Infallible;
use tracing::info;

use super::credentials::Credentials;
use crate::AppState;

/// GET /api/decks/:deck_id/analysis/stream
pub async fn analysis_stream(
    State(state): State<AppState>,
    Path(deck_id): Path<String>,
    credentials: Credentials,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(deck_id = %deck_id, "New SSE client connected to deck analysis");

    let rx = state.pipeline.clone().stream(credentials.0, deck_id);
    Sse::new(channel_stream(rx))
}
