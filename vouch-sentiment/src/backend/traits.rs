//! Chat model contract.
//!
//! Sentiment judging needs one thing from a model: a single-turn reply to a
//! system instruction plus the post text. [`LlmBackend`] exposes exactly
//! that, plus a startup check that the configured model is actually served.

use std::time::Duration;

use async_trait::async_trait;

/// Error types for model calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The configured model is not served by the endpoint
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    /// Non-success HTTP status
    #[error("Request failed: HTTP {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// The endpoint asked us to back off
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Transport failure or timeout
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response body did not match the chat completion shape
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// A chat model that answers one instruction about one input.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Model name sent with every request.
    fn model(&self) -> &str;

    /// Confirm the endpoint serves [`LlmBackend::model`].
    async fn check_model(&self) -> Result<(), LlmError>;

    /// Reply text for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Single-turn completion: one system instruction, one user input.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub input: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the endpoint to constrain output to a JSON object
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            input: input.into(),
            max_tokens: 256,
            temperature: 0.0,
            json_output: false,
        }
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    /// Clamped to the 0.0..=2.0 range chat endpoints accept.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}
