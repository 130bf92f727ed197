//! Scripted model for tests and offline runs

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{Completion, CompletionRequest, ModelError, TextModel, Usage};

/// Mock model
///
/// Answers from a script of outcomes in order; once the script is used up
/// every call returns the fallback response.
pub struct MockModel {
    model_id: String,
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    fallback: String,
    delay: Option<Duration>,
    call_count: AtomicU32,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockModel {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: "{}".to_string(),
            delay: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Response returned once the script is exhausted
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.fallback = content.into();
        self
    }

    /// Queue one outcome
    pub fn then(self, outcome: Result<String, ModelError>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
        self
    }

    /// Sleep before answering (simulates provider latency)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Most recent request received
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl TextModel for MockModel {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ModelError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()));

        let content = outcome?;
        let usage = Usage {
            prompt_tokens: (request.system_prompt.len() + request.user_prompt.len()) as u32 / 4,
            completion_tokens: content.len() as u32 / 4,
        };
        Ok(Completion { content, usage })
    }
}
