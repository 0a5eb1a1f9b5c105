//! One validation iteration, end to end.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;
use vouch_sentiment::SentimentScorer;
use vouch_social::EvidenceService;

use crate::blacklist::MinerBlacklist;
use crate::config::ValidatorConfig;
use crate::dispatcher::ChallengeDispatcher;
use crate::ledger::{Ledger, Vote};
use crate::miner_client::ClaimSource;
use crate::pipeline::VerificationPipeline;
use crate::scoring::{ScoreEngine, ScoringPolicy};
use crate::store::{rolling_maxima, ContentBlacklist, DiscoveryStore, ReceiptStore, WeightStore};
use crate::types::{ChallengeOutcome, Result, ScoreMap, ValidatorError};
use crate::weights::WeightAggregator;

/// External collaborators a validator runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn Ledger>,
    pub claims: Arc<dyn ClaimSource>,
    pub evidence: Arc<dyn EvidenceService>,
    pub sentiment: Arc<dyn SentimentScorer>,
    pub receipts: Arc<dyn ReceiptStore>,
    pub discoveries: Arc<dyn DiscoveryStore>,
    pub content_blacklist: Arc<dyn ContentBlacklist>,
    pub weights: Arc<dyn WeightStore>,
    pub miner_blacklist: MinerBlacklist,
}

/// What happened to the vote at the end of an iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteStatus {
    Submitted(Vote),
    Skipped(String),
    Failed(String),
}

/// Summary of one iteration.
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub iteration_id: Uuid,
    pub registry_size: usize,
    pub challenged: usize,
    pub verified: usize,
    /// Rejection counts by reason label
    pub rejected: BTreeMap<&'static str, usize>,
    pub scores: ScoreMap,
    pub vote: VoteStatus,
    pub elapsed: Duration,
}

impl IterationReport {
    pub fn new(iteration_id: Uuid) -> Self {
        Self {
            iteration_id,
            registry_size: 0,
            challenged: 0,
            verified: 0,
            rejected: BTreeMap::new(),
            scores: ScoreMap::new(),
            vote: VoteStatus::Skipped("not started".into()),
            elapsed: Duration::ZERO,
        }
    }

    fn reject(&mut self, label: &'static str) {
        *self.rejected.entry(label).or_default() += 1;
    }
}

/// The validator: challenges, scores and votes once per call.
pub struct Validator {
    config: ValidatorConfig,
    ledger: Arc<dyn Ledger>,
    receipts: Arc<dyn ReceiptStore>,
    discoveries: Arc<dyn DiscoveryStore>,
    dispatcher: ChallengeDispatcher,
    engine: ScoreEngine,
    aggregator: WeightAggregator,
}

impl Validator {
    pub fn new(config: ValidatorConfig, policy: ScoringPolicy, parts: Collaborators) -> Self {
        let pipeline = VerificationPipeline::new(
            parts.claims,
            parts.evidence,
            parts.sentiment,
            parts.receipts.clone(),
            parts.content_blacklist,
            parts.miner_blacklist,
        )
        .with_window_days(policy.window_days);

        let aggregator = WeightAggregator::new(
            parts.weights,
            parts.ledger.clone(),
            config.network_id,
            config.max_allowed_weights,
        );

        Self {
            dispatcher: ChallengeDispatcher::new(pipeline, parts.discoveries.clone()),
            engine: ScoreEngine::new(policy),
            ledger: parts.ledger,
            receipts: parts.receipts,
            discoveries: parts.discoveries,
            aggregator,
            config,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn miner_blacklist(&self) -> &MinerBlacklist {
        self.dispatcher.pipeline().miner_blacklist()
    }

    /// Run one iteration.
    ///
    /// Registry and identity failures are returned; vote failures are logged
    /// and reported in [`IterationReport::vote`].
    pub async fn run_iteration(&self) -> Result<IterationReport> {
        let iteration_id = Uuid::new_v4();
        let span = info_span!("iteration", iteration = %iteration_id);

        self.iterate(iteration_id).instrument(span).await
    }

    async fn iterate(&self, iteration_id: Uuid) -> Result<IterationReport> {
        let start = Instant::now();
        let mut report = IterationReport::new(iteration_id);

        let registry = self.ledger.list_miners(self.config.network_id).await?;
        report.registry_size = registry.len();

        let own_key = self.config.validator_key.trim();
        if !registry.iter().any(|m| m.ledger_key == own_key) {
            return Err(ValidatorError::NotRegistered(own_key.to_string()));
        }

        info!(miners = registry.len(), network_id = self.config.network_id, "Fetched miner registry");

        let outcomes = self.dispatcher.dispatch(&registry).await;
        report.challenged = outcomes.len();

        let maxima = rolling_maxima(
            self.receipts.as_ref(),
            self.discoveries.as_ref(),
            self.engine.policy().window_days,
        )
        .await?;

        for (uid, outcome) in &outcomes {
            let evidence = match outcome {
                ChallengeOutcome::Verified(evidence) => evidence,
                ChallengeOutcome::Rejected { reason } => {
                    report.reject(reason.label());
                    report.scores.insert(*uid, 0.0);
                    continue;
                }
            };

            let score = self.engine.score(evidence, &maxima);

            match self.receipts.record_receipt(evidence, score).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(uid = *uid, content_id = %evidence.content_id, "Content scored by another miner this round");
                    report.reject("duplicate_content");
                    report.scores.insert(*uid, 0.0);
                    continue;
                }
                Err(e) => {
                    // Without a receipt the content would pass dedup again.
                    error!(uid = *uid, content_id = %evidence.content_id, error = %e, "Failed to record receipt");
                    report.reject("store_failed");
                    report.scores.insert(*uid, 0.0);
                    continue;
                }
            }

            if let Err(e) = self.discoveries.record_discovery(*uid, evidence).await {
                error!(uid = *uid, miner_key = %evidence.miner_key, error = %e, "Failed to record discovery");
            }

            info!(uid = *uid, miner_key = %evidence.miner_key, score, "Scored miner");
            report.verified += 1;
            report.scores.insert(*uid, score);
        }

        report.vote = if report.verified == 0 {
            info!("No miner managed to give a valid answer, skipping vote");
            VoteStatus::Skipped("no verified evidence".into())
        } else {
            match self.aggregator.submit(&report.scores).await {
                Ok(Some(vote)) => VoteStatus::Submitted(vote),
                Ok(None) => VoteStatus::Skipped("empty weight map".into()),
                Err(e) => {
                    error!(error = %e, "Failed to set weights");
                    VoteStatus::Failed(e.to_string())
                }
            }
        };

        report.elapsed = start.elapsed();
        info!(
            registry = report.registry_size,
            challenged = report.challenged,
            verified = report.verified,
            rejected = ?report.rejected,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Iteration complete"
        );

        Ok(report)
    }
}
