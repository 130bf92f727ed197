//! Model Invoker
//!
//! Sends a rendered request to the text model. One attempt plus at most one
//! retry, and only for transient failures (transport, timeout, 429, 5xx).

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::prompt_builder::GenerationRequest;
use crate::error::AnalysisError;
use crate::model::{CompletionRequest, ModelError, TextModel};

/// Attempts per invocation including the retry
const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone)]
pub struct InvokerSettings {
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Fixed pause before the retry
    pub retry_delay: Duration,
}

impl Default for InvokerSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: 1200,
            temperature: 0.2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

pub struct ModelInvoker {
    model: Arc<dyn TextModel>,
    settings: InvokerSettings,
}

impl ModelInvoker {
    pub fn new(model: Arc<dyn TextModel>, settings: InvokerSettings) -> Self {
        Self { model, settings }
    }

    pub fn model_id(&self) -> &str {
        self.model.id()
    }

    /// Returns the raw model text
    pub async fn invoke(&self, request: &GenerationRequest) -> Result<String, AnalysisError> {
        let completion_request = CompletionRequest::new(&request.instructions, request.user_prompt())
            .with_max_tokens(self.settings.max_output_tokens)
            .with_temperature(self.settings.temperature)
            .with_json_output();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.model.complete(&completion_request).await {
                Ok(completion) => {
                    info!(
                        target: "deckscope::usage",
                        model = self.model.id(),
                        attempt,
                        prompt_tokens = completion.usage.prompt_tokens,
                        completion_tokens = completion.usage.completion_tokens,
                        total_tokens = completion.usage.total(),
                        retained_cards = request.retained_cards,
                        total_cards = request.total_cards,
                        "Model usage"
                    );
                    return Ok(completion.content);
                }
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        model = self.model.id(),
                        attempt,
                        error = %err,
                        delay_ms = self.settings.retry_delay.as_millis() as u64,
                        "Transient model failure, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(err) => {
                    warn!(model = self.model.id(), attempt, error = %err, "Model call failed");
                    return Err(classify(err));
                }
            }
        }
    }
}

fn classify(err: ModelError) -> AnalysisError {
    if err.is_transient() {
        AnalysisError::model_unavailable(err.to_string())
    } else {
        AnalysisError::model_rejected(err.to_string())
    }
}
