//! Verification Pipeline.
//!
//! Turns one miner's claims into a [`ChallengeOutcome`]. Stages run strictly
//! in order and any of them may end the challenge:
//!
//! ```text
//!  blacklist ─▶ claims ─▶ dedup ─▶ select ─▶ author ─▶ ownership
//!                                                         │
//!      assemble ◀─ similarity ◀─ sentiment ◀─ content ◀───┘
//! ```
//!
//! Author, ownership and content failures exclude the miner for the rest of
//! the process and blacklist the claimed content. Claims are only taken with
//! canonical numeric ids, and the fetched post must carry the claimed id, so
//! every dedup and blacklist key is the id the platform itself uses.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use vouch_sentiment::SentimentScorer;
use vouch_social::EvidenceService;

use crate::blacklist::MinerBlacklist;
use crate::miner_client::ClaimSource;
use crate::ownership::verify_ownership;
use crate::store::{ContentBlacklist, ReceiptStore};
use crate::types::{ChallengeOutcome, Claim, EngagementMetrics, EvidenceRecord, MinerRecord, ProfileMetrics, RejectReason};

struct Rejection {
    reason: RejectReason,
    content_id: Option<String>,
}

impl Rejection {
    fn new(reason: RejectReason) -> Self {
        Self {
            reason,
            content_id: None,
        }
    }

    fn for_claim(reason: RejectReason, claim: &Claim) -> Self {
        Self {
            reason,
            content_id: Some(claim.content_id.clone()),
        }
    }
}

/// Per-miner verification state machine. Cheap to clone into tasks.
#[derive(Clone)]
pub struct VerificationPipeline {
    claims: Arc<dyn ClaimSource>,
    evidence: Arc<dyn EvidenceService>,
    sentiment: Arc<dyn SentimentScorer>,
    receipts: Arc<dyn ReceiptStore>,
    content_blacklist: Arc<dyn ContentBlacklist>,
    miner_blacklist: MinerBlacklist,
    window_days: u32,
}

impl VerificationPipeline {
    pub fn new(
        claims: Arc<dyn ClaimSource>,
        evidence: Arc<dyn EvidenceService>,
        sentiment: Arc<dyn SentimentScorer>,
        receipts: Arc<dyn ReceiptStore>,
        content_blacklist: Arc<dyn ContentBlacklist>,
        miner_blacklist: MinerBlacklist,
    ) -> Self {
        Self {
            claims,
            evidence,
            sentiment,
            receipts,
            content_blacklist,
            miner_blacklist,
            window_days: 30,
        }
    }

    /// Similarity window in days.
    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    pub fn miner_blacklist(&self) -> &MinerBlacklist {
        &self.miner_blacklist
    }

    /// Challenge one miner. Never fails: every error becomes a rejection.
    pub async fn challenge(&self, miner: &MinerRecord) -> ChallengeOutcome {
        let start = Instant::now();
        info!(uid = miner.uid, miner_key = %miner.ledger_key, "Challenging miner");

        let outcome = match self.verify(miner).await {
            Ok(evidence) => {
                info!(
                    uid = miner.uid,
                    miner_key = %miner.ledger_key,
                    content_id = %evidence.content_id,
                    "Miner evidence verified"
                );
                ChallengeOutcome::Verified(evidence)
            }
            Err(rejection) => {
                self.apply_rejection(miner, &rejection).await;
                ChallengeOutcome::rejected(rejection.reason)
            }
        };

        debug!(
            uid = miner.uid,
            miner_key = %miner.ledger_key,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Challenge finished"
        );
        outcome
    }

    async fn apply_rejection(&self, miner: &MinerRecord, rejection: &Rejection) {
        info!(
            uid = miner.uid,
            miner_key = %miner.ledger_key,
            reason = %rejection.reason,
            "Miner produced no evidence"
        );

        if !rejection.reason.blacklists_miner() {
            return;
        }

        self.miner_blacklist.insert(&miner.ledger_key, rejection.reason.clone());

        if let Some(content_id) = &rejection.content_id {
            if let Err(e) = self
                .content_blacklist
                .blacklist(content_id, rejection.reason.label())
                .await
            {
                error!(content_id = %content_id, error = %e, "Failed to blacklist content");
            }
        }
    }

    async fn verify(&self, miner: &MinerRecord) -> Result<EvidenceRecord, Rejection> {
        if self.miner_blacklist.contains(&miner.ledger_key) {
            return Err(Rejection::new(RejectReason::MinerBlacklisted));
        }

        let claims = self
            .claims
            .fetch_claims(miner)
            .await
            .map_err(|e| Rejection::new(RejectReason::ClaimFetchFailed(e.to_string())))?;

        let claim = self.select_fresh_claim(claims).await?;

        let profile = self
            .evidence
            .fetch_profile(&claim.author_id)
            .await
            .map_err(|e| Rejection::new(RejectReason::ProfileUnavailable(e.to_string())))?;

        if !profile.verified {
            return Err(Rejection::for_claim(RejectReason::AuthorNotVerified, &claim));
        }

        verify_ownership(&profile.description, &miner.ledger_key).map_err(|e| {
            Rejection::for_claim(RejectReason::OwnershipProofFailed(e.to_string()), &claim)
        })?;

        let content = self
            .evidence
            .fetch_content(&claim.content_id)
            .await
            .map_err(|e| Rejection::for_claim(RejectReason::ContentUnavailable(e.to_string()), &claim))?;

        if content.content_id != claim.content_id {
            warn!(
                claimed = %claim.content_id,
                resolved = %content.content_id,
                "Claimed id resolved to a different post"
            );
            return Err(Rejection::for_claim(RejectReason::ContentMismatch, &claim));
        }

        if content.author_id != claim.author_id {
            return Err(Rejection::for_claim(RejectReason::AuthorMismatch, &claim));
        }

        let positivity = self
            .sentiment
            .score_positivity(&content.text)
            .await
            .map_err(|e| Rejection::new(RejectReason::SentimentFailed(e.to_string())))?;

        let similarity = self
            .receipts
            .similarity_against_window(&content.text, self.window_days)
            .await
            .map_err(|e| Rejection::new(RejectReason::StoreFailed(e.to_string())))?;

        Ok(EvidenceRecord {
            content_id: content.content_id,
            author_id: profile.author_id,
            author_name: profile.username,
            miner_key: miner.ledger_key.clone(),
            miner_name: miner.display_name.clone(),
            profile: ProfileMetrics {
                followers: profile.followers,
                following: profile.following,
                posts: profile.post_count,
                likes: profile.like_count,
                listed: profile.listed_count,
            },
            engagement: EngagementMetrics {
                amplification: content.amplification,
                replies: content.replies,
                likes: content.likes,
                quotes: content.quotes,
                bookmarks: content.bookmarks,
                impressions: content.impressions,
            },
            content_text: content.text,
            created_at: content.created_at,
            similarity: similarity.clamp(0.0, 1.0),
            positivity: positivity.clamp(0.0, 100.0),
        })
    }

    /// First claim, in miner order, with canonical ids that was never scored
    /// or blacklisted.
    async fn select_fresh_claim(&self, claims: Vec<Claim>) -> Result<Claim, Rejection> {
        for claim in claims {
            if !claim.has_platform_ids() {
                debug!(content_id = ?claim.content_id, author_id = ?claim.author_id, "Malformed claim ids");
                continue;
            }

            let scored = self
                .receipts
                .is_content_scored(&claim.content_id)
                .await
                .map_err(|e| Rejection::new(RejectReason::StoreFailed(e.to_string())))?;
            if scored {
                debug!(content_id = %claim.content_id, "Content already scored");
                continue;
            }

            let blacklisted = self
                .content_blacklist
                .is_blacklisted(&claim.content_id)
                .await
                .map_err(|e| Rejection::new(RejectReason::StoreFailed(e.to_string())))?;
            if blacklisted {
                debug!(content_id = %claim.content_id, "Content blacklisted");
                continue;
            }

            return Ok(claim);
        }

        Err(Rejection::new(RejectReason::NoFreshClaims))
    }
}
