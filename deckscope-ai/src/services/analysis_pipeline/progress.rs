//! Progress reporting for analysis runs
//!
//! [`StepTracker`] enforces the forward-only state machine and
//! [`ProgressEmitter`] turns accepted transitions into events on an
//! [`EventSink`]. The emitter sends at most one terminal event per run.

use chrono::{DateTime, Utc};
use deckscope_common::events::{AnalysisEvent, AnalysisStep, DebugData, DoneData, ErrorData};
use deckscope_common::sse::StreamItem;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::models::{DeckAnalysis, PersistedAnalysis};

pub type DeckEvent = AnalysisEvent<DeckAnalysis>;

/// Destination of a run's events
pub trait EventSink: Send {
    /// Deliver one event; `false` once the receiver is gone
    fn send(&mut self, event: DeckEvent) -> bool;

    /// Whether anyone is still listening
    fn is_open(&self) -> bool {
        true
    }
}

/// Streams events into an SSE channel
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StreamItem<DeckAnalysis>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<StreamItem<DeckAnalysis>>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn send(&mut self, event: DeckEvent) -> bool {
        self.tx.send(StreamItem::Event(event)).is_ok()
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Keeps every event in memory (non-streaming transport, tests)
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Vec<DeckEvent>,
}

impl EventSink for CollectingSink {
    fn send(&mut self, event: DeckEvent) -> bool {
        self.events.push(event);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Illegal analysis transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: AnalysisStep,
    pub to: AnalysisStep,
}

/// Record of an accepted transition
#[derive(Debug, Clone)]
pub struct StepTransition {
    pub run_id: Uuid,
    pub old_step: AnalysisStep,
    pub new_step: AnalysisStep,
    pub transitioned_at: DateTime<Utc>,
}

/// Current state of one run
#[derive(Debug)]
pub struct StepTracker {
    run_id: Uuid,
    step: AnalysisStep,
}

impl StepTracker {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            step: AnalysisStep::Idle,
        }
    }

    pub fn step(&self) -> AnalysisStep {
        self.step
    }

    /// Move to the direct successor, or to FAILED from any non-terminal state
    pub fn transition_to(&mut self, new_step: AnalysisStep) -> Result<StepTransition, IllegalTransition> {
        let legal = match new_step {
            AnalysisStep::Failed => !self.step.is_terminal(),
            _ => self.step.next() == Some(new_step),
        };
        if !legal {
            return Err(IllegalTransition {
                from: self.step,
                to: new_step,
            });
        }

        let transition = StepTransition {
            run_id: self.run_id,
            old_step: self.step,
            new_step,
            transitioned_at: Utc::now(),
        };
        self.step = new_step;
        Ok(transition)
    }
}

/// Lifecycle event emitter for one run
pub struct ProgressEmitter<'a, S: EventSink> {
    sink: &'a mut S,
    tracker: StepTracker,
    debug_events: bool,
    disconnected: bool,
}

impl<'a, S: EventSink> ProgressEmitter<'a, S> {
    pub fn new(sink: &'a mut S, run_id: Uuid, debug_events: bool) -> Self {
        Self {
            sink,
            tracker: StepTracker::new(run_id),
            debug_events,
            disconnected: false,
        }
    }

    pub fn step(&self) -> AnalysisStep {
        self.tracker.step()
    }

    /// Client went away (a send failed or the sink reports closed)
    pub fn is_disconnected(&mut self) -> bool {
        if !self.disconnected && !self.sink.is_open() {
            self.disconnected = true;
        }
        self.disconnected
    }

    /// Enter a working state and report its progress
    ///
    /// Returns `false` if the client is gone.
    pub fn enter(&mut self, step: AnalysisStep) -> bool {
        if !self.advance(step) {
            return !self.is_disconnected();
        }
        if let Some(event) = AnalysisEvent::progress(step) {
            self.emit(event);
        }
        !self.is_disconnected()
    }

    /// Intermediate artifact, only when debug events are enabled
    pub fn debug<T: Serialize>(&mut self, label: &str, data: &T) {
        if !self.debug_events {
            return;
        }
        match serde_json::to_value(data) {
            Ok(data) => self.emit(AnalysisEvent::Debug(DebugData {
                label: label.to_string(),
                data,
            })),
            Err(e) => error!(label, error = %e, "Failed to serialize debug payload"),
        }
    }

    /// Terminal success event
    pub fn finish(&mut self, persisted: &PersistedAnalysis) {
        if !self.advance(AnalysisStep::Done) {
            return;
        }
        self.emit(AnalysisEvent::Done(DoneData {
            progress: AnalysisStep::Done.progress().unwrap_or(100),
            target_id: persisted.deck_id.clone(),
            result: persisted.result.clone(),
        }));
    }

    /// Terminal failure event with the client-safe message
    pub fn fail(&mut self, err: &AnalysisError) {
        if !self.advance(AnalysisStep::Failed) {
            return;
        }
        self.emit(AnalysisEvent::Error(ErrorData {
            message: err.public_message().to_string(),
        }));
    }

    fn advance(&mut self, step: AnalysisStep) -> bool {
        match self.tracker.transition_to(step) {
            Ok(transition) => {
                debug!(
                    run_id = %transition.run_id,
                    from = %transition.old_step,
                    to = %transition.new_step,
                    "Analysis step"
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Rejected analysis transition");
                false
            }
        }
    }

    fn emit(&mut self, event: DeckEvent) {
        if self.disconnected {
            return;
        }
        if !self.sink.send(event) {
            debug!(step = %self.tracker.step(), "Event receiver gone");
            self.disconnected = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SCHEMA_VERSION;

    #[test]
    fn test_tracker_rejects_skips_and_revisits() {
        let mut tracker = StepTracker::new(Uuid::new_v4());
        assert!(tracker.transition_to(AnalysisStep::Loading).is_err());
        assert!(tracker.transition_to(AnalysisStep::Authenticating).is_ok());
        assert!(tracker.transition_to(AnalysisStep::Authenticating).is_err());
        assert!(tracker.transition_to(AnalysisStep::Loading).is_ok());
        assert!(tracker.transition_to(AnalysisStep::Failed).is_ok());
        assert!(tracker.transition_to(AnalysisStep::Failed).is_err());
        assert!(tracker.transition_to(AnalysisStep::Compressing).is_err());
        assert_eq!(tracker.step(), AnalysisStep::Failed);
    }

    #[test]
    fn test_single_terminal_event() {
        let mut sink = CollectingSink::default();
        let mut emitter = ProgressEmitter::new(&mut sink, Uuid::new_v4(), false);
        assert!(emitter.enter(AnalysisStep::Authenticating));
        emitter.fail(&AnalysisError::unauthenticated());
        emitter.fail(&AnalysisError::storage("again"));
        emitter.finish(&PersistedAnalysis {
            deck_id: "D1".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            model: "m".to_string(),
            generated_at: Utc::now(),
            result: DeckAnalysis::default(),
        });

        let terminal: Vec<_> = sink.events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        assert_eq!(
            terminal[0],
            &AnalysisEvent::Error(ErrorData {
                message: "Authentication required".to_string()
            })
        );
    }

    #[test]
    fn test_debug_events_gated() {
        let mut sink = CollectingSink::default();
        let mut emitter = ProgressEmitter::new(&mut sink, Uuid::new_v4(), false);
        emitter.debug("features", &serde_json::json!({"a": 1}));
        assert!(sink.events.is_empty());

        let mut emitter = ProgressEmitter::new(&mut sink, Uuid::new_v4(), true);
        emitter.debug("features", &serde_json::json!({"a": 1}));
        assert_eq!(sink.events.len(), 1);
        assert_eq!(sink.events[0].event_type(), "debug");
    }

    #[test]
    fn test_channel_close_marks_disconnected() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx);
        let mut emitter = ProgressEmitter::new(&mut sink, Uuid::new_v4(), false);
        assert!(emitter.enter(AnalysisStep::Authenticating));
        drop(rx);
        assert!(!emitter.enter(AnalysisStep::Loading));
        assert!(emitter.is_disconnected());
    }
}
