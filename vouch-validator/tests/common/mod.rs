//! Shared fixtures for validator integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use vouch_sentiment::{LlmSentimentScorer, MockBackend};
use vouch_social::{AuthorProfile, ContentDetails, MockEvidenceService};
use vouch_validator::{
    ClaimError, ClaimSource, Claim, Collaborators, EngagementMetrics, EvidenceRecord, MemoryLedger,
    MemoryWeightStore, MinerBlacklist, MinerRecord, ReceiptStore, ScoringPolicy, SqliteStore, StoreError,
    Validator, ValidatorConfig, VerificationPipeline,
};

pub const KEY_A: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
pub const KEY_B: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
pub const KEY_C: &str = "5FLSigC9HGRKVhB9FiEo4Y3koPsNmBmLJbpXg2mp1hXcS59Y";
pub const VALIDATOR_KEY: &str = "5DAAnrj7VHTznn2AWBemMuyBwZWs6FNFjdyVXUeYum3PTXFy";

/// Claim source answering from a fixed table keyed by miner key.
#[derive(Default)]
pub struct FakeClaimSource {
    claims: Mutex<HashMap<String, Vec<Claim>>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicU32,
}

impl FakeClaimSource {
    pub fn set_claims(&self, miner_key: &str, claims: Vec<Claim>) {
        self.claims.lock().unwrap().insert(miner_key.to_string(), claims);
    }

    pub fn fail_for(&self, miner_key: &str) {
        self.failing.lock().unwrap().insert(miner_key.to_string());
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClaimSource for FakeClaimSource {
    async fn fetch_claims(&self, miner: &MinerRecord) -> Result<Vec<Claim>, ClaimError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(&miner.ledger_key) {
            return Err(ClaimError::NetworkError("connection refused".into()));
        }

        Ok(self
            .claims
            .lock()
            .unwrap()
            .get(&miner.ledger_key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Receipt store whose writes always fail; reads go to the wrapped store.
pub struct FailingReceiptWrites(pub Arc<SqliteStore>);

#[async_trait]
impl ReceiptStore for FailingReceiptWrites {
    async fn is_content_scored(&self, content_id: &str) -> Result<bool, StoreError> {
        self.0.is_content_scored(content_id).await
    }

    async fn record_receipt(&self, _evidence: &EvidenceRecord, _score: f64) -> Result<bool, StoreError> {
        Err(StoreError::Internal("disk full".into()))
    }

    async fn similarity_against_window(&self, text: &str, window_days: u32) -> Result<f64, StoreError> {
        self.0.similarity_against_window(text, window_days).await
    }

    async fn engagement_maxima(&self, window_days: u32) -> Result<EngagementMetrics, StoreError> {
        self.0.engagement_maxima(window_days).await
    }
}

pub fn miner(uid: u16, key: &str, address: &str) -> MinerRecord {
    MinerRecord {
        uid,
        ledger_key: key.to_string(),
        display_name: format!("miner-{}", uid),
        address: address.to_string(),
        emission: 10.0 + f64::from(uid),
    }
}

pub fn validator_record() -> MinerRecord {
    miner(0, VALIDATOR_KEY, "")
}

pub fn claim(content_id: &str, author_id: &str) -> Claim {
    Claim {
        content_id: content_id.to_string(),
        author_id: author_id.to_string(),
        content_text: format!("post {}", content_id),
    }
}

pub fn profile(author_id: &str, description: &str, followers: u64) -> AuthorProfile {
    AuthorProfile {
        author_id: author_id.to_string(),
        username: format!("user{}", author_id),
        verified: true,
        followers,
        following: 200,
        post_count: 1_000,
        like_count: 5_000,
        listed_count: 10,
        description: description.to_string(),
    }
}

pub fn content(content_id: &str, author_id: &str, text: &str) -> ContentDetails {
    ContentDetails {
        content_id: content_id.to_string(),
        text: text.to_string(),
        created_at: Utc::now() - Duration::hours(2),
        author_id: author_id.to_string(),
        amplification: 12,
        replies: 4,
        likes: 90,
        quotes: 1,
        bookmarks: 3,
        impressions: 8_000,
    }
}

pub struct Harness {
    pub ledger: Arc<MemoryLedger>,
    pub claims: Arc<FakeClaimSource>,
    pub evidence: Arc<MockEvidenceService>,
    pub backend: Arc<MockBackend>,
    pub store: Arc<SqliteStore>,
    pub weights: Arc<MemoryWeightStore>,
    pub blacklist: MinerBlacklist,
}

impl Harness {
    pub fn new(miners: Vec<MinerRecord>) -> Self {
        Self::with_backend(miners, MockBackend::default().with_response(r#"{"positivity": 80}"#))
    }

    pub fn with_backend(miners: Vec<MinerRecord>, backend: MockBackend) -> Self {
        Self {
            ledger: Arc::new(MemoryLedger::new(miners)),
            claims: Arc::new(FakeClaimSource::default()),
            evidence: Arc::new(MockEvidenceService::new()),
            backend: Arc::new(backend),
            store: Arc::new(SqliteStore::open_in_memory().unwrap()),
            weights: Arc::new(MemoryWeightStore::default()),
            blacklist: MinerBlacklist::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            ledger: self.ledger.clone(),
            claims: self.claims.clone(),
            evidence: self.evidence.clone(),
            sentiment: Arc::new(LlmSentimentScorer::new(self.backend.clone())),
            receipts: self.store.clone(),
            discoveries: self.store.clone(),
            content_blacklist: self.store.clone(),
            weights: self.weights.clone(),
            miner_blacklist: self.blacklist.clone(),
        }
    }

    pub fn pipeline(&self) -> VerificationPipeline {
        let parts = self.collaborators();
        VerificationPipeline::new(
            parts.claims,
            parts.evidence,
            parts.sentiment,
            parts.receipts,
            parts.content_blacklist,
            parts.miner_blacklist,
        )
    }

    pub fn validator(&self, max_allowed_weights: usize) -> Validator {
        self.validator_with(self.collaborators(), max_allowed_weights)
    }

    pub fn validator_with(&self, parts: Collaborators, max_allowed_weights: usize) -> Validator {
        let config = ValidatorConfig {
            network_id: 17,
            validator_key: VALIDATOR_KEY.to_string(),
            max_allowed_weights,
            ..Default::default()
        };
        Validator::new(config, ScoringPolicy::default(), parts)
    }

    /// Register a verified author owned by `miner_key` with one post.
    pub fn author_with_post(&self, author_id: &str, miner_key: &str, content_id: &str, followers: u64) {
        self.evidence
            .insert_profile(profile(author_id, &format!("vouching as {}", miner_key), followers));
        self.evidence.insert_content(content(
            content_id,
            author_id,
            &format!("post {} about the decentralized future", content_id),
        ));
    }
}
