//! Event types for deckscope analysis streams
//!
//! Every analysis run reports its lifecycle through [`AnalysisEvent`]. The
//! same values drive the SSE wire format (event name + JSON data) and the
//! in-process collectors used by the non-streaming endpoint and tests.

use serde::{Deserialize, Serialize};

/// Analysis pipeline state
///
/// Runs progress strictly forward through
/// IDLE → AUTHENTICATING → LOADING → COMPRESSING → PROMPTING → INVOKING →
/// NORMALIZING → PERSISTING → DONE, or jump to FAILED from any non-terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStep {
    /// Run created, nothing started
    Idle,
    /// Resolving the caller and checking deck ownership
    Authenticating,
    /// Reading the deck's active cards
    Loading,
    /// Reducing the cards to a feature summary
    Compressing,
    /// Rendering the bounded prompt
    Prompting,
    /// Waiting on the generative model
    Invoking,
    /// Repairing model output into the schema
    Normalizing,
    /// Writing the analysis back
    Persisting,
    /// Run finished, result persisted
    Done,
    /// Run aborted with an error
    Failed,
}

impl AnalysisStep {
    /// Forward sequence of non-failure states
    pub const SEQUENCE: [AnalysisStep; 9] = [
        AnalysisStep::Idle,
        AnalysisStep::Authenticating,
        AnalysisStep::Loading,
        AnalysisStep::Compressing,
        AnalysisStep::Prompting,
        AnalysisStep::Invoking,
        AnalysisStep::Normalizing,
        AnalysisStep::Persisting,
        AnalysisStep::Done,
    ];

    /// Completion percentage reported when the state is entered
    ///
    /// Strictly increasing along [`Self::SEQUENCE`]. `Failed` has no
    /// percentage; it is reported through the terminal error event.
    pub fn progress(self) -> Option<u8> {
        match self {
            AnalysisStep::Idle => Some(0),
            AnalysisStep::Authenticating => Some(5),
            AnalysisStep::Loading => Some(15),
            AnalysisStep::Compressing => Some(35),
            AnalysisStep::Prompting => Some(45),
            AnalysisStep::Invoking => Some(65),
            AnalysisStep::Normalizing => Some(85),
            AnalysisStep::Persisting => Some(92),
            AnalysisStep::Done => Some(100),
            AnalysisStep::Failed => None,
        }
    }

    /// Machine-readable identifier (matches the serde form)
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStep::Idle => "idle",
            AnalysisStep::Authenticating => "authenticating",
            AnalysisStep::Loading => "loading",
            AnalysisStep::Compressing => "compressing",
            AnalysisStep::Prompting => "prompting",
            AnalysisStep::Invoking => "invoking",
            AnalysisStep::Normalizing => "normalizing",
            AnalysisStep::Persisting => "persisting",
            AnalysisStep::Done => "done",
            AnalysisStep::Failed => "failed",
        }
    }

    /// True for DONE and FAILED
    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStep::Done | AnalysisStep::Failed)
    }

    /// The only legal non-failure successor
    pub fn next(self) -> Option<AnalysisStep> {
        let index = Self::SEQUENCE.iter().position(|s| *s == self)?;
        Self::SEQUENCE.get(index + 1).copied()
    }
}

impl std::fmt::Display for AnalysisStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `progress` event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressData {
    pub step: AnalysisStep,
    pub progress: u8,
}

/// `debug` event data (only emitted when debug events are enabled)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugData {
    pub label: String,
    pub data: serde_json::Value,
}

/// `error` event data (terminal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
}

/// `done` event data (terminal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoneData<R> {
    pub progress: u8,
    pub target_id: String,
    pub result: R,
}

/// Analysis lifecycle event
///
/// `R` is the structured result type carried by the `done` event. Consumers
/// that do not know the concrete type can use the `serde_json::Value` default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum AnalysisEvent<R = serde_json::Value> {
    Progress(ProgressData),
    Debug(DebugData),
    Error(ErrorData),
    Done(DoneData<R>),
}

impl<R> AnalysisEvent<R> {
    /// Progress event for a state that carries a percentage
    pub fn progress(step: AnalysisStep) -> Option<Self> {
        step.progress()
            .map(|progress| AnalysisEvent::Progress(ProgressData { step, progress }))
    }

    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            AnalysisEvent::Progress(_) => "progress",
            AnalysisEvent::Debug(_) => "debug",
            AnalysisEvent::Error(_) => "error",
            AnalysisEvent::Done(_) => "done",
        }
    }

    /// True for `error` and `done`
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisEvent::Error(_) | AnalysisEvent::Done(_))
    }
}

impl<R: Serialize> AnalysisEvent<R> {
    /// JSON data line for the SSE frame (payload only, no tag)
    pub fn data_json(&self) -> serde_json::Result<String> {
        match self {
            AnalysisEvent::Progress(data) => serde_json::to_string(data),
            AnalysisEvent::Debug(data) => serde_json::to_string(data),
            AnalysisEvent::Error(data) => serde_json::to_string(data),
            AnalysisEvent::Done(data) => serde_json::to_string(data),
        }
    }
}
