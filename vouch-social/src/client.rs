//! HTTP client for the social media v2 REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::rate_limit::CredentialPool;
use crate::service::{is_platform_id, AuthorProfile, ContentDetails, EvidenceService, SocialError};

/// Public API root.
pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

const USER_FIELDS: &str = "description,public_metrics,username,verified";
const TWEET_FIELDS: &str = "author_id,created_at,note_tweet,public_metrics,text";

/// Rate-limited client for user and post lookups.
pub struct XApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<CredentialPool>,
}

impl XApiClient {
    /// Create a client against `base_url` with a per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<CredentialPool>,
        timeout: Duration,
    ) -> Result<Self, SocialError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SocialError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Client against the public API.
    pub fn public(credentials: Arc<CredentialPool>, timeout: Duration) -> Result<Self, SocialError> {
        Self::new(DEFAULT_BASE_URL, credentials, timeout)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SocialError> {
        let credential = self.credentials.acquire().await;
        let url = format!("{}{}", self.base_url, path);

        debug!(url = %url, "Calling social API");

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(header::AUTHORIZATION, format!("Bearer {}", credential.token()))
            .send()
            .await
            .map_err(|e| SocialError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SocialError::RateLimited);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(SocialError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SocialError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SocialError::ParseError(e.to_string()))
    }
}

/// Envelope for single-object lookups; `data` is absent when the API reports
/// the object in `errors` instead.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    username: String,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    description: String,
    public_metrics: UserMetrics,
}

#[derive(Debug, Deserialize)]
struct UserMetrics {
    followers_count: u64,
    following_count: u64,
    tweet_count: u64,
    listed_count: u64,
    #[serde(default)]
    like_count: u64,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
    text: String,
    author_id: String,
    created_at: DateTime<Utc>,
    public_metrics: TweetMetrics,
    note_tweet: Option<NoteTweet>,
}

#[derive(Debug, Deserialize)]
struct NoteTweet {
    text: String,
}

#[derive(Debug, Deserialize)]
struct TweetMetrics {
    retweet_count: u64,
    reply_count: u64,
    like_count: u64,
    quote_count: u64,
    #[serde(default)]
    bookmark_count: u64,
    #[serde(default)]
    impression_count: u64,
}

impl From<UserData> for AuthorProfile {
    fn from(user: UserData) -> Self {
        Self {
            author_id: user.id,
            username: user.username,
            verified: user.verified,
            followers: user.public_metrics.followers_count,
            following: user.public_metrics.following_count,
            post_count: user.public_metrics.tweet_count,
            like_count: user.public_metrics.like_count,
            listed_count: user.public_metrics.listed_count,
            description: user.description,
        }
    }
}

impl From<TweetData> for ContentDetails {
    fn from(tweet: TweetData) -> Self {
        let text = match tweet.note_tweet {
            Some(note) if !note.text.is_empty() => note.text,
            _ => tweet.text,
        };

        Self {
            content_id: tweet.id,
            text,
            created_at: tweet.created_at,
            author_id: tweet.author_id,
            amplification: tweet.public_metrics.retweet_count,
            replies: tweet.public_metrics.reply_count,
            likes: tweet.public_metrics.like_count,
            quotes: tweet.public_metrics.quote_count,
            bookmarks: tweet.public_metrics.bookmark_count,
            impressions: tweet.public_metrics.impression_count,
        }
    }
}

#[async_trait]
impl EvidenceService for XApiClient {
    async fn fetch_profile(&self, author_id: &str) -> Result<AuthorProfile, SocialError> {
        if !is_platform_id(author_id) {
            return Err(SocialError::InvalidId(author_id.to_string()));
        }

        let path = format!("/2/users/{}", author_id);
        let envelope: Envelope<UserData> = self.get(&path, &[("user.fields", USER_FIELDS)]).await?;

        envelope
            .data
            .map(AuthorProfile::from)
            .ok_or_else(|| SocialError::NotFound(format!("user {}", author_id)))
    }

    async fn fetch_content(&self, content_id: &str) -> Result<ContentDetails, SocialError> {
        if !is_platform_id(content_id) {
            return Err(SocialError::InvalidId(content_id.to_string()));
        }

        let path = format!("/2/tweets/{}", content_id);
        let envelope: Envelope<TweetData> =
            self.get(&path, &[("tweet.fields", TWEET_FIELDS)]).await?;

        envelope
            .data
            .map(ContentDetails::from)
            .ok_or_else(|| SocialError::NotFound(format!("post {}", content_id)))
    }
}
