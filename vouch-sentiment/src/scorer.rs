//! Positivity scoring of post text.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::backend::traits::{CompletionRequest, LlmBackend, LlmError};

/// Error types for sentiment scoring.
#[derive(Debug, thiserror::Error)]
pub enum SentimentError {
    /// Backend error
    #[error("Backend error: {0}")]
    BackendError(#[from] LlmError),

    /// The reply carried no usable score
    #[error("Unrecognised sentiment reply: {0}")]
    UnrecognisedReply(String),
}

/// Scores how positive a piece of text is, from 0 (hostile) to 100 (glowing).
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    async fn score_positivity(&self, text: &str) -> Result<f64, SentimentError>;
}

const SYSTEM_PROMPT: &str = "You rate the sentiment of social media posts. \
Reply with a JSON object {\"positivity\": N} where N is a number from 0 to 100: \
0 is openly negative or hostile, 50 is neutral, 100 is enthusiastically positive. \
Reply with the JSON object only.";

/// Upper bound on post text forwarded to the model.
const MAX_TEXT_CHARS: usize = 8_000;

/// `SentimentScorer` backed by a chat completion model.
pub struct LlmSentimentScorer {
    backend: Arc<dyn LlmBackend>,
}

impl LlmSentimentScorer {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    fn build_request(text: &str) -> CompletionRequest {
        let text: String = text.chars().take(MAX_TEXT_CHARS).collect();

        CompletionRequest::new(SYSTEM_PROMPT, format!("Post:\n{}", text))
            .with_max_tokens(32)
            .with_temperature(0.0)
            .with_json_output()
    }
}

#[async_trait]
impl SentimentScorer for LlmSentimentScorer {
    async fn score_positivity(&self, text: &str) -> Result<f64, SentimentError> {
        if text.trim().is_empty() {
            warn!("Post text is empty, scoring as not positive");
            return Ok(0.0);
        }

        let reply = self.backend.complete(&Self::build_request(text)).await?;
        let score = parse_positivity(&reply).ok_or(SentimentError::UnrecognisedReply(reply))?;

        debug!(model = self.backend.model(), score, "Scored post sentiment");
        Ok(score)
    }
}

/// Extract a 0-100 score from a model reply.
///
/// Accepts `{"positivity": N}`, then the first number in the text, then the
/// bare words "positive" / "negative".
pub fn parse_positivity(reply: &str) -> Option<f64> {
    static NUMBER: OnceLock<Option<Regex>> = OnceLock::new();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(reply) {
        if let Some(n) = value.get("positivity").and_then(|v| v.as_f64()) {
            return Some(n.clamp(0.0, 100.0));
        }
    }

    let number = NUMBER.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").ok());
    if let Some(n) = number
        .as_ref()
        .and_then(|re| re.find(reply))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        return Some(n.clamp(0.0, 100.0));
    }

    let lower = reply.to_lowercase();
    if lower.contains("negative") {
        Some(0.0)
    } else if lower.contains("positive") {
        Some(100.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    #[test]
    fn test_parse_json_reply() {
        assert_eq!(parse_positivity(r#"{"positivity": 72.5}"#), Some(72.5));
    }

    #[test]
    fn test_parse_clamps_out_of_range() {
        assert_eq!(parse_positivity(r#"{"positivity": 140}"#), Some(100.0));
        assert_eq!(parse_positivity("-3"), Some(0.0));
    }

    #[test]
    fn test_parse_loose_number() {
        assert_eq!(parse_positivity("Score: 64 out of 100"), Some(64.0));
    }

    #[test]
    fn test_parse_label_reply() {
        assert_eq!(parse_positivity("Positive"), Some(100.0));
        assert_eq!(parse_positivity("The tone is negative."), Some(0.0));
        assert_eq!(parse_positivity("no idea"), None);
    }

    #[tokio::test]
    async fn test_scorer_uses_backend() {
        let backend = Arc::new(MockBackend::default().with_response(r#"{"positivity": 80}"#));
        let scorer = LlmSentimentScorer::new(backend.clone());

        let score = scorer.score_positivity("Loving this protocol").await.unwrap();

        assert_eq!(score, 80.0);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].input, "Post:\nLoving this protocol");
        assert_eq!(requests[0].temperature, 0.0);
        assert!(requests[0].json_output);
    }

    #[tokio::test]
    async fn test_long_text_is_truncated() {
        let backend = Arc::new(MockBackend::default());
        let scorer = LlmSentimentScorer::new(backend.clone());

        scorer.score_positivity(&"a".repeat(MAX_TEXT_CHARS * 2)).await.unwrap();

        let input = &backend.requests()[0].input;
        assert_eq!(input.chars().filter(|c| *c == 'a').count(), MAX_TEXT_CHARS);
    }

    #[tokio::test]
    async fn test_empty_text_skips_backend() {
        let backend = Arc::new(MockBackend::default());
        let scorer = LlmSentimentScorer::new(backend.clone());

        let score = scorer.score_positivity("   ").await.unwrap();

        assert_eq!(score, 0.0);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unrecognised_reply_is_error() {
        let backend = Arc::new(MockBackend::default().with_response("I cannot help with that"));
        let scorer = LlmSentimentScorer::new(backend);

        let result = scorer.score_positivity("Loving this protocol").await;
        assert!(matches!(result, Err(SentimentError::UnrecognisedReply(_))));
    }
}
