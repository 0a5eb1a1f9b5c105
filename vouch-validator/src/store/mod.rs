//! Persistence contracts and their implementations.
//!
//! ## Contracts
//!
//! - [`ReceiptStore`] - scored content, deduplication, similarity, engagement maxima
//! - [`DiscoveryStore`] - miner rank bookkeeping and author profile maxima
//! - [`ContentBlacklist`] - content that may never be scored
//! - [`WeightStore`] - the weight map carried across iterations
//!
//! [`SqliteStore`] implements the first three; weights live in a JSON file
//! ([`FileWeightStore`]) or in memory ([`MemoryWeightStore`]).

pub mod schema;
pub mod sqlite;
pub mod weights;

use async_trait::async_trait;

use crate::types::{EngagementMetrics, EvidenceRecord, PopulationMaxima, ProfileMetrics, Uid, WeightMap};

pub use sqlite::SqliteStore;
pub use weights::{FileWeightStore, MemoryWeightStore};

/// Error types for persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Receipts of scored content.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn is_content_scored(&self, content_id: &str) -> Result<bool, StoreError>;

    /// Persist a receipt. Returns `false` when the content was already scored.
    async fn record_receipt(&self, evidence: &EvidenceRecord, score: f64) -> Result<bool, StoreError>;

    /// Highest similarity of `text` to content scored in the last `window_days`.
    async fn similarity_against_window(&self, text: &str, window_days: u32) -> Result<f64, StoreError>;

    /// Per-metric engagement maxima over the window, floored when empty.
    async fn engagement_maxima(&self, window_days: u32) -> Result<EngagementMetrics, StoreError>;
}

/// Miner discovery records.
#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    /// Record a miner's ledger-reported name and emission.
    async fn update_rank(&self, miner_key: &str, miner_name: &str, emission: f64) -> Result<(), StoreError>;

    /// Record the author profile behind a miner's verified evidence.
    async fn record_discovery(&self, uid: Uid, evidence: &EvidenceRecord) -> Result<(), StoreError>;

    /// Per-metric profile maxima over the window, floored when empty.
    async fn profile_maxima(&self, window_days: u32) -> Result<ProfileMetrics, StoreError>;
}

/// Persisted content-level blacklist.
#[async_trait]
pub trait ContentBlacklist: Send + Sync {
    async fn is_blacklisted(&self, content_id: &str) -> Result<bool, StoreError>;

    /// Idempotent.
    async fn blacklist(&self, content_id: &str, reason: &str) -> Result<(), StoreError>;
}

/// Weight map persisted across iterations and restarts.
#[async_trait]
pub trait WeightStore: Send + Sync {
    async fn load(&self) -> Result<WeightMap, StoreError>;

    async fn store(&self, weights: &WeightMap) -> Result<(), StoreError>;
}

/// Both rolling maxima for one iteration.
pub async fn rolling_maxima(
    receipts: &dyn ReceiptStore,
    discoveries: &dyn DiscoveryStore,
    window_days: u32,
) -> Result<PopulationMaxima, StoreError> {
    let (profile, engagement) = futures::try_join!(
        discoveries.profile_maxima(window_days),
        receipts.engagement_maxima(window_days),
    )?;

    Ok(PopulationMaxima { profile, engagement })
}
