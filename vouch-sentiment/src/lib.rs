//! Vouch Sentiment - positivity scoring of post text
//!
//! Provides:
//! - Trait-based LLM backends (OpenAI-compatible, mock)
//! - `SentimentScorer`, the 0-100 positivity contract the validator consumes
//! - `LlmSentimentScorer`, which asks a backend for a structured score

pub mod backend;
pub mod scorer;

pub use backend::traits::{CompletionRequest, LlmBackend, LlmError};
pub use backend::{MockBackend, OpenAiBackend};
pub use scorer::{LlmSentimentScorer, SentimentError, SentimentScorer};
