//! Evidence service contract.
//!
//! This module defines the `EvidenceService` trait - the validator's only view
//! of the social media platform - and the records it returns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error types for social API operations.
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    /// The credential pool is empty
    #[error("No API credentials configured")]
    NoCredentials,

    /// Rate limit settings cannot be satisfied
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Transport failure or timeout
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Non-success HTTP status
    #[error("Request failed: HTTP {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// The API rejected the call with 429
    #[error("Rate limited by the social API")]
    RateLimited,

    /// The requested user or post does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Id is not a platform snowflake id
    #[error("Invalid id: {0:?}")]
    InvalidId(String),
}

/// Longest decimal rendering of a 64-bit id.
const MAX_ID_DIGITS: usize = 20;

/// Whether `id` is a canonical user or post id: decimal digits only.
///
/// Anything else could be rewritten by URL resolution into another id.
pub fn is_platform_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_DIGITS && id.bytes().all(|b| b.is_ascii_digit())
}

/// Public profile of a post author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorProfile {
    /// Platform user id
    pub author_id: String,
    /// Handle without the leading `@`
    pub username: String,
    /// Whether the platform has verified the account identity
    pub verified: bool,
    pub followers: u64,
    pub following: u64,
    pub post_count: u64,
    pub like_count: u64,
    pub listed_count: u64,
    /// Free-text bio; miners embed their ledger key here as ownership proof
    pub description: String,
}

/// Full details of a single post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDetails {
    pub content_id: String,
    /// Post text (long-form text when the post was truncated)
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: String,
    /// Reposts
    pub amplification: u64,
    pub replies: u64,
    pub likes: u64,
    pub quotes: u64,
    pub bookmarks: u64,
    pub impressions: u64,
}

/// Stateless queries against the social media platform.
///
/// Implementations are responsible for their own rate limiting; callers may
/// invoke these concurrently from many miner pipelines.
#[async_trait]
pub trait EvidenceService: Send + Sync {
    /// Fetch an author's profile and public metrics.
    async fn fetch_profile(&self, author_id: &str) -> Result<AuthorProfile, SocialError>;

    /// Fetch a post's text, creation time and engagement metrics.
    async fn fetch_content(&self, content_id: &str) -> Result<ContentDetails, SocialError>;
}
