//! Mock evidence service for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::service::{AuthorProfile, ContentDetails, EvidenceService, SocialError};

/// In-memory evidence service.
///
/// Unknown ids answer `NotFound`; ids registered with `with_failing_content`
/// answer a network error.
#[derive(Default)]
pub struct MockEvidenceService {
    profiles: RwLock<HashMap<String, AuthorProfile>>,
    contents: RwLock<HashMap<String, ContentDetails>>,
    failing_content: RwLock<Vec<String>>,
    call_count: AtomicU32,
}

impl MockEvidenceService {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile.
    pub fn with_profile(self, profile: AuthorProfile) -> Self {
        self.insert_profile(profile);
        self
    }

    /// Register a post.
    pub fn with_content(self, content: ContentDetails) -> Self {
        self.insert_content(content);
        self
    }

    /// Make lookups of a post fail with a network error.
    pub fn with_failing_content(self, content_id: impl Into<String>) -> Self {
        if let Ok(mut failing) = self.failing_content.write() {
            failing.push(content_id.into());
        }
        self
    }

    /// Register or replace a profile.
    pub fn insert_profile(&self, profile: AuthorProfile) {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.insert(profile.author_id.clone(), profile);
        }
    }

    /// Register or replace a post.
    pub fn insert_content(&self, content: ContentDetails) {
        if let Ok(mut contents) = self.contents.write() {
            contents.insert(content.content_id.clone(), content);
        }
    }

    /// Serve `content` for lookups of `lookup_id` as well, the way the
    /// platform resolves a legacy or alias id to its canonical post.
    pub fn insert_content_alias(&self, lookup_id: impl Into<String>, content: ContentDetails) {
        if let Ok(mut contents) = self.contents.write() {
            contents.insert(lookup_id.into(), content);
        }
    }

    /// Total number of lookups served.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvidenceService for MockEvidenceService {
    async fn fetch_profile(&self, author_id: &str) -> Result<AuthorProfile, SocialError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        self.profiles
            .read()
            .ok()
            .and_then(|profiles| profiles.get(author_id).cloned())
            .ok_or_else(|| SocialError::NotFound(format!("user {}", author_id)))
    }

    async fn fetch_content(&self, content_id: &str) -> Result<ContentDetails, SocialError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_content
            .read()
            .map(|failing| failing.iter().any(|id| id == content_id))
            .unwrap_or(false);
        if failing {
            return Err(SocialError::NetworkError("connection reset".to_string()));
        }

        self.contents
            .read()
            .ok()
            .and_then(|contents| contents.get(content_id).cloned())
            .ok_or_else(|| SocialError::NotFound(format!("post {}", content_id)))
    }
}
