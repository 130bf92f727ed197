//! Error types for deckscope-ai
//!
//! Analysis failures are split by who is at fault. Caller faults map to 4xx
//! and short-circuit before the model is called; system faults map to 5xx.
//! The two never share a variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure caused by the request itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallerFault {
    /// No principal could be resolved from the credentials
    #[error("Authentication required")]
    Unauthenticated,

    /// Principal resolved but does not own the deck
    #[error("Deck {deck_id} is not owned by the caller")]
    NotOwner { deck_id: String },

    /// Deck does not exist
    #[error("Deck not found: {deck_id}")]
    NotFound { deck_id: String },

    /// Deck exists but has no main board cards
    #[error("Deck {deck_id} has no main board cards")]
    EmptySnapshot { deck_id: String },
}

/// Failure of the service or one of its collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SystemFault {
    #[error("Failed to load deck: {0}")]
    Load(String),

    /// Transport failure or timeout talking to the model provider
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Provider answered with an explicit error
    #[error("Model rejected request: {0}")]
    ModelRejected(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Terminal outcome of a failed analysis run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Caller(#[from] CallerFault),

    #[error(transparent)]
    System(#[from] SystemFault),
}

impl AnalysisError {
    pub fn unauthenticated() -> Self {
        CallerFault::Unauthenticated.into()
    }

    pub fn not_owner(deck_id: impl Into<String>) -> Self {
        CallerFault::NotOwner { deck_id: deck_id.into() }.into()
    }

    pub fn not_found(deck_id: impl Into<String>) -> Self {
        CallerFault::NotFound { deck_id: deck_id.into() }.into()
    }

    pub fn empty_snapshot(deck_id: impl Into<String>) -> Self {
        CallerFault::EmptySnapshot { deck_id: deck_id.into() }.into()
    }

    pub fn load(detail: impl Into<String>) -> Self {
        SystemFault::Load(detail.into()).into()
    }

    pub fn model_unavailable(detail: impl Into<String>) -> Self {
        SystemFault::ModelUnavailable(detail.into()).into()
    }

    pub fn model_rejected(detail: impl Into<String>) -> Self {
        SystemFault::ModelRejected(detail.into()).into()
    }

    pub fn storage(detail: impl Into<String>) -> Self {
        SystemFault::Storage(detail.into()).into()
    }

    pub fn is_caller_fault(&self) -> bool {
        matches!(self, AnalysisError::Caller(_))
    }

    /// HTTP status for the non-streaming transport
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::Caller(CallerFault::Unauthenticated) => StatusCode::UNAUTHORIZED,
            AnalysisError::Caller(CallerFault::NotOwner { .. }) => StatusCode::FORBIDDEN,
            AnalysisError::Caller(CallerFault::NotFound { .. }) => StatusCode::NOT_FOUND,
            AnalysisError::Caller(CallerFault::EmptySnapshot { .. }) => StatusCode::BAD_REQUEST,
            AnalysisError::System(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Caller(CallerFault::Unauthenticated) => "UNAUTHENTICATED",
            AnalysisError::Caller(CallerFault::NotOwner { .. }) => "NOT_OWNER",
            AnalysisError::Caller(CallerFault::NotFound { .. }) => "NOT_FOUND",
            AnalysisError::Caller(CallerFault::EmptySnapshot { .. }) => "EMPTY_SNAPSHOT",
            AnalysisError::System(SystemFault::Load(_)) => "LOAD_ERROR",
            AnalysisError::System(SystemFault::ModelUnavailable(_)) => "MODEL_UNAVAILABLE",
            AnalysisError::System(SystemFault::ModelRejected(_)) => "MODEL_REJECTED",
            AnalysisError::System(SystemFault::Storage(_)) => "STORAGE_ERROR",
        }
    }

    /// Message safe to send to clients
    ///
    /// Never includes provider or database detail; that goes to the log.
    pub fn public_message(&self) -> &'static str {
        match self {
            AnalysisError::Caller(CallerFault::Unauthenticated) => "Authentication required",
            AnalysisError::Caller(CallerFault::NotOwner { .. }) => {
                "You do not own this deck"
            }
            AnalysisError::Caller(CallerFault::NotFound { .. }) => "Deck not found",
            AnalysisError::Caller(CallerFault::EmptySnapshot { .. }) => {
                "Deck has no main board cards to analyze"
            }
            AnalysisError::System(SystemFault::Load(_)) => "Could not load the deck",
            AnalysisError::System(SystemFault::ModelUnavailable(_)) => {
                "The analysis model is unavailable, please try again later"
            }
            AnalysisError::System(SystemFault::ModelRejected(_)) => {
                "The analysis model could not process this deck"
            }
            AnalysisError::System(SystemFault::Storage(_)) => "Could not save the analysis",
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Pipeline or guard failure
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
            ApiError::Analysis(err) => {
                (err.status_code(), err.code(), err.public_message().to_string())
            }
        };

        let body = Json(json!({
            "ok": false,
            "code": code,
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
