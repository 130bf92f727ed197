//! Analysis pipeline orchestrator
//!
//! Runs the stages strictly left to right for one request:
//!
//! AUTHENTICATING → LOADING → COMPRESSING → PROMPTING → INVOKING →
//! NORMALIZING → PERSISTING → DONE
//!
//! Control returns here after every stage. Before entering the next stage
//! the orchestrator reports progress and stops if the client has gone away;
//! results of a disconnected run are discarded and never persisted. Any
//! failure produces exactly one terminal `error` event.
//!
//! Streaming runs get a keep-alive heartbeat task whose guard lives in the
//! run's task, so it is released on every exit path.

pub mod progress;

use deckscope_common::events::AnalysisStep;
use deckscope_common::sse::{spawn_heartbeat, StreamItem, DEFAULT_HEARTBEAT_INTERVAL};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::access_guard::{AccessGuard, IdentityProvider};
use super::feature_compressor::FeatureCompressor;
use super::model_invoker::{InvokerSettings, ModelInvoker};
use super::persister::Persister;
use super::prompt_builder::PromptBuilder;
use super::result_normalizer::normalize;
use super::snapshot_loader::SnapshotLoader;
use crate::db::DeckStore;
use crate::error::AnalysisError;
use crate::model::TextModel;
use crate::models::{DeckAnalysis, PersistedAnalysis};

pub use progress::{ChannelSink, CollectingSink, EventSink, ProgressEmitter, StepTracker};

/// Per-service pipeline knobs (built from the service config)
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_prompt_chars: usize,
    pub invoker: InvokerSettings,
    pub heartbeat_interval: Duration,
    /// Emit `debug` events with intermediate artifacts
    pub debug_events: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_prompt_chars: 12_000,
            invoker: InvokerSettings::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            debug_events: false,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(PersistedAnalysis),
    Failed(AnalysisError),
    /// Client left before completion; nothing further was written
    Disconnected,
}

/// Why a run stopped early
enum Halt {
    Failed(AnalysisError),
    Disconnected,
}

impl From<AnalysisError> for Halt {
    fn from(err: AnalysisError) -> Self {
        Halt::Failed(err)
    }
}

/// Collaborators of the pipeline
pub struct PipelineDeps {
    pub store: Arc<dyn DeckStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub compressor: Arc<dyn FeatureCompressor>,
    pub model: Arc<dyn TextModel>,
}

/// Deck analysis pipeline (shared by all requests, holds no per-run state)
pub struct AnalysisPipeline {
    guard: AccessGuard,
    loader: SnapshotLoader,
    compressor: Arc<dyn FeatureCompressor>,
    prompt_builder: PromptBuilder,
    invoker: ModelInvoker,
    persister: Persister,
    settings: PipelineSettings,
}

impl AnalysisPipeline {
    pub fn new(deps: PipelineDeps, settings: PipelineSettings) -> Self {
        Self {
            guard: AccessGuard::new(deps.identity, deps.store.clone()),
            loader: SnapshotLoader::new(deps.store.clone()),
            compressor: deps.compressor,
            prompt_builder: PromptBuilder::new(settings.max_prompt_chars),
            invoker: ModelInvoker::new(deps.model, settings.invoker.clone()),
            persister: Persister::new(deps.store),
            settings,
        }
    }

    /// Ownership check only (used by read endpoints)
    pub fn access_guard(&self) -> &AccessGuard {
        &self.guard
    }

    /// Run one analysis, reporting lifecycle events to `sink`
    pub async fn run<S: EventSink>(
        &self,
        token: Option<&str>,
        deck_id: &str,
        sink: &mut S,
    ) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%run_id, deck_id, "Analysis started");

        let mut emitter = ProgressEmitter::new(sink, run_id, self.settings.debug_events);
        let result = self.execute(&mut emitter, token, deck_id, run_id).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(persisted) => {
                emitter.finish(&persisted);
                info!(%run_id, deck_id, elapsed_ms, "Analysis completed");
                RunOutcome::Completed(persisted)
            }
            Err(Halt::Failed(err)) => {
                if err.is_caller_fault() {
                    info!(%run_id, deck_id, step = %emitter.step(), code = err.code(), "Analysis refused");
                } else {
                    warn!(%run_id, deck_id, step = %emitter.step(), error = %err, elapsed_ms, "Analysis failed");
                }
                emitter.fail(&err);
                RunOutcome::Failed(err)
            }
            Err(Halt::Disconnected) => {
                info!(%run_id, deck_id, step = %emitter.step(), elapsed_ms, "Client disconnected, analysis discarded");
                RunOutcome::Disconnected
            }
        }
    }

    /// Spawn a streaming run and return the channel its events arrive on
    ///
    /// The channel closes once the run has ended and the heartbeat stopped.
    pub fn stream(
        self: Arc<Self>,
        token: Option<String>,
        deck_id: String,
    ) -> mpsc::UnboundedReceiver<StreamItem<DeckAnalysis>> {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let heartbeat = spawn_heartbeat(tx.clone(), self.settings.heartbeat_interval);
            let mut sink = ChannelSink::new(tx);
            self.run(token.as_deref(), &deck_id, &mut sink).await;
            heartbeat.shutdown().await;
        });

        rx
    }

    async fn execute<S: EventSink>(
        &self,
        emitter: &mut ProgressEmitter<'_, S>,
        token: Option<&str>,
        deck_id: &str,
        run_id: Uuid,
    ) -> Result<PersistedAnalysis, Halt> {
        enter(emitter, AnalysisStep::Authenticating)?;
        let (principal, deck) = self.guard.authorize(token, deck_id).await?;

        enter(emitter, AnalysisStep::Loading)?;
        let snapshot = self.loader.load(deck).await?;

        enter(emitter, AnalysisStep::Compressing)?;
        let features = self.compressor.compress(&snapshot);
        emitter.debug("features", &features);

        enter(emitter, AnalysisStep::Prompting)?;
        let request = self.prompt_builder.build(&snapshot, &features);
        if request.is_truncated() {
            info!(
                %run_id,
                deck_id,
                retained_cards = request.retained_cards,
                total_cards = request.total_cards,
                "Prompt truncated"
            );
        }
        emitter.debug(
            "prompt",
            &json!({
                "rendered_len": request.rendered_len(),
                "retained_cards": request.retained_cards,
                "total_cards": request.total_cards,
            }),
        );

        enter(emitter, AnalysisStep::Invoking)?;
        let raw = self.invoker.invoke(&request).await?;

        enter(emitter, AnalysisStep::Normalizing)?;
        let analysis = normalize(&raw, request.coverage());
        emitter.debug("normalized", &analysis);

        enter(emitter, AnalysisStep::Persisting)?;
        let persisted = self
            .persister
            .persist(&principal, deck_id, self.invoker.model_id(), analysis)
            .await?;

        Ok(persisted)
    }
}

/// Stage boundary: report the new step, stop if nobody listens
fn enter<S: EventSink>(emitter: &mut ProgressEmitter<'_, S>, step: AnalysisStep) -> Result<(), Halt> {
    if emitter.enter(step) {
        Ok(())
    } else {
        Err(Halt::Disconnected)
    }
}
