//! Scripted backend for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{CompletionRequest, LlmBackend, LlmError};

/// Replies with a fixed text, or fails every call when built with
/// [`MockBackend::failing`]. Requests are recorded.
pub struct MockBackend {
    model: String,
    reply: Result<String, String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockBackend {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            reply: Ok(r#"{"positivity": 50}"#.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Backend whose model is offline.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            reply: Err(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_response(mut self, reply: impl Into<String>) -> Self {
        self.reply = Ok(reply.into());
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn check_model(&self) -> Result<(), LlmError> {
        self.reply
            .as_ref()
            .map(|_| ())
            .map_err(|reason| LlmError::Unavailable(reason.clone()))
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        self.reply
            .clone()
            .map_err(LlmError::Unavailable)
    }
}
