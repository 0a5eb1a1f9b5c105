//! Core types for the validation loop.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Miner slot on the network.
pub type Uid = u16;

/// Per-iteration scores, uid -> score in [0, 100].
pub type ScoreMap = BTreeMap<Uid, f64>;

/// Persisted ledger weights, uid -> weight in [0, 1000].
pub type WeightMap = BTreeMap<Uid, u16>;

/// A registered miner as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerRecord {
    pub uid: Uid,
    pub ledger_key: String,
    pub display_name: String,
    /// Raw `host:port` string, possibly unparsable.
    pub address: String,
    pub emission: f64,
}

impl MinerRecord {
    /// The parsed address, or `None` when the miner is unreachable.
    pub fn network_address(&self) -> Option<NetworkAddress> {
        NetworkAddress::parse(&self.address)
    }
}

/// A miner's reachable endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAddress {
    pub host: String,
    pub port: u16,
}

impl NetworkAddress {
    /// Parse `host:port`. A `None` host means the miner bound every interface.
    pub fn parse(raw: &str) -> Option<Self> {
        let (host, port) = raw.trim().rsplit_once(':')?;
        let port = port.parse::<u16>().ok()?;
        let host = match host {
            "None" => "0.0.0.0",
            "" => return None,
            other => other,
        };

        Some(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Evidence a miner claims to have produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub content_id: String,
    pub author_id: String,
    pub content_text: String,
}

impl Claim {
    /// Both ids are canonical platform ids, so dedup and blacklist lookups
    /// see the same key the platform resolves.
    pub fn has_platform_ids(&self) -> bool {
        vouch_social::is_platform_id(&self.content_id) && vouch_social::is_platform_id(&self.author_id)
    }
}

/// Author reach at the time of verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetrics {
    pub followers: u64,
    pub following: u64,
    pub posts: u64,
    pub likes: u64,
    pub listed: u64,
}

impl ProfileMetrics {
    /// Maxima used when no discoveries exist in the window.
    pub const FLOOR: Self = Self {
        followers: 100_000,
        following: 10_000,
        posts: 10_000,
        likes: 100_000,
        listed: 1_000,
    };
}

/// Engagement the content received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub amplification: u64,
    pub replies: u64,
    pub likes: u64,
    pub quotes: u64,
    pub bookmarks: u64,
    pub impressions: u64,
}

impl EngagementMetrics {
    /// Maxima used when no receipts exist in the window.
    pub const FLOOR: Self = Self {
        amplification: 1_000,
        replies: 1_000,
        likes: 10_000,
        quotes: 1_000,
        bookmarks: 1_000,
        impressions: 100_000,
    };
}

/// Rolling-window upper bounds used to normalize metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationMaxima {
    pub profile: ProfileMetrics,
    pub engagement: EngagementMetrics,
}

impl Default for PopulationMaxima {
    fn default() -> Self {
        Self {
            profile: ProfileMetrics::FLOOR,
            engagement: EngagementMetrics::FLOOR,
        }
    }
}

/// A claim that passed every verification step. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub content_id: String,
    pub author_id: String,
    pub author_name: String,
    pub miner_key: String,
    pub miner_name: String,
    pub profile: ProfileMetrics,
    pub engagement: EngagementMetrics,
    pub content_text: String,
    pub created_at: DateTime<Utc>,
    /// Highest similarity to previously scored content, 0..=1.
    pub similarity: f64,
    /// Positivity of the content text, 0..=100.
    pub positivity: f64,
}

/// Why a miner produced no evidence this round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum RejectReason {
    MinerBlacklisted,
    ClaimFetchFailed(String),
    NoFreshClaims,
    ProfileUnavailable(String),
    AuthorNotVerified,
    OwnershipProofFailed(String),
    ContentUnavailable(String),
    AuthorMismatch,
    ContentMismatch,
    SentimentFailed(String),
    StoreFailed(String),
    TaskFailed(String),
}

impl RejectReason {
    /// Whether this rejection excludes the miner for the rest of the process.
    pub fn blacklists_miner(&self) -> bool {
        matches!(
            self,
            RejectReason::AuthorNotVerified
                | RejectReason::OwnershipProofFailed(_)
                | RejectReason::ContentUnavailable(_)
                | RejectReason::AuthorMismatch
                | RejectReason::ContentMismatch
        )
    }

    /// Short stable label, used as a counter key.
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::MinerBlacklisted => "miner_blacklisted",
            RejectReason::ClaimFetchFailed(_) => "claim_fetch_failed",
            RejectReason::NoFreshClaims => "no_fresh_claims",
            RejectReason::ProfileUnavailable(_) => "profile_unavailable",
            RejectReason::AuthorNotVerified => "author_not_verified",
            RejectReason::OwnershipProofFailed(_) => "ownership_proof_failed",
            RejectReason::ContentUnavailable(_) => "content_unavailable",
            RejectReason::AuthorMismatch => "author_mismatch",
            RejectReason::ContentMismatch => "content_mismatch",
            RejectReason::SentimentFailed(_) => "sentiment_failed",
            RejectReason::StoreFailed(_) => "store_failed",
            RejectReason::TaskFailed(_) => "task_failed",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ClaimFetchFailed(d)
            | RejectReason::ProfileUnavailable(d)
            | RejectReason::OwnershipProofFailed(d)
            | RejectReason::ContentUnavailable(d)
            | RejectReason::SentimentFailed(d)
            | RejectReason::StoreFailed(d)
            | RejectReason::TaskFailed(d) => write!(f, "{}: {}", self.label(), d),
            _ => f.write_str(self.label()),
        }
    }
}

/// Result of challenging one miner.
#[derive(Debug, Clone, PartialEq)]
pub enum ChallengeOutcome {
    Verified(EvidenceRecord),
    Rejected { reason: RejectReason },
}

impl ChallengeOutcome {
    pub fn rejected(reason: RejectReason) -> Self {
        ChallengeOutcome::Rejected { reason }
    }

    pub fn evidence(&self) -> Option<&EvidenceRecord> {
        match self {
            ChallengeOutcome::Verified(evidence) => Some(evidence),
            ChallengeOutcome::Rejected { .. } => None,
        }
    }
}

/// Error types for the validator.
#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    /// Ledger query or vote failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Persistence failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// This validator's own key is not in the registry
    #[error("Validator key {0} is not registered on the network")]
    NotRegistered(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let addr = NetworkAddress::parse("10.0.0.7:8000").unwrap();
        assert_eq!(addr.host, "10.0.0.7");
        assert_eq!(addr.port, 8000);
        assert_eq!(addr.to_string(), "10.0.0.7:8000");
    }

    #[test]
    fn test_parse_none_host() {
        let addr = NetworkAddress::parse("None:9001").unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:9001");
    }

    #[test]
    fn test_parse_unreachable() {
        assert!(NetworkAddress::parse("").is_none());
        assert!(NetworkAddress::parse("localhost").is_none());
        assert!(NetworkAddress::parse("host:port").is_none());
        assert!(NetworkAddress::parse(":8000").is_none());
    }

    #[test]
    fn test_blacklisting_reasons() {
        assert!(RejectReason::AuthorNotVerified.blacklists_miner());
        assert!(RejectReason::AuthorMismatch.blacklists_miner());
        assert!(RejectReason::ContentMismatch.blacklists_miner());
        assert!(RejectReason::ContentUnavailable("gone".into()).blacklists_miner());
        assert!(!RejectReason::NoFreshClaims.blacklists_miner());
        assert!(!RejectReason::ProfileUnavailable("timeout".into()).blacklists_miner());
        assert!(!RejectReason::SentimentFailed("down".into()).blacklists_miner());
    }

    #[test]
    fn test_claim_ids() {
        let claim = |content_id: &str, author_id: &str| Claim {
            content_id: content_id.into(),
            author_id: author_id.into(),
            content_text: String::new(),
        };

        assert!(claim("1837218394036133951", "1281521441025011715").has_platform_ids());
        assert!(!claim("123?", "42").has_platform_ids());
        assert!(!claim("123", "42#").has_platform_ids());
        assert!(!claim("", "42").has_platform_ids());
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(RejectReason::NoFreshClaims.to_string(), "no_fresh_claims");
        assert_eq!(
            RejectReason::ClaimFetchFailed("timeout".into()).to_string(),
            "claim_fetch_failed: timeout"
        );
    }
}
