//! Generative text model seam
//!
//! The pipeline talks to the model through [`TextModel`] only. Production
//! uses [`OpenAiCompatibleModel`]; tests script [`MockModel`].

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mock::MockModel;
pub use openai::OpenAiCompatibleModel;

/// Provider call failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Connection refused, reset, DNS failure
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    /// HTTP 429
    #[error("Rate limited by provider")]
    RateLimited,

    /// HTTP 5xx
    #[error("Provider server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    /// Explicit refusal (HTTP 4xx other than 429)
    #[error("Provider rejected request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Successful status but unusable body
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

impl ModelError {
    /// Worth one more attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ModelError::Transport(_)
                | ModelError::Timeout
                | ModelError::RateLimited
                | ModelError::Server { .. }
        )
    }
}

/// One chat completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON object (`response_format: json_object`)
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens: None,
            temperature: None,
            json_output: false,
        }
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp.clamp(0.0, 2.0));
        self
    }

    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Raw model answer
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Untyped text, handed to the result normalizer as is
    pub content: String,
    pub usage: Usage,
}

/// Generative text model
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Model identifier recorded with persisted results
    fn id(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ModelError::Transport("reset".into()).is_transient());
        assert!(ModelError::Timeout.is_transient());
        assert!(ModelError::RateLimited.is_transient());
        assert!(ModelError::Server { status: 503, body: String::new() }.is_transient());
        assert!(!ModelError::Rejected { status: 400, body: String::new() }.is_transient());
        assert!(!ModelError::Malformed("no choices".into()).is_transient());
    }

    #[test]
    fn test_usage_total_saturates() {
        let usage = Usage {
            prompt_tokens: u32::MAX,
            completion_tokens: 1,
        };
        assert_eq!(usage.total(), u32::MAX);
        assert_eq!(Usage { prompt_tokens: 3, completion_tokens: 4 }.total(), 7);
    }

    #[test]
    fn test_temperature_clamped() {
        let req = CompletionRequest::new("s", "u").with_temperature(5.0);
        assert_eq!(req.temperature, Some(2.0));
    }
}
