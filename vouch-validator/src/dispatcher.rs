//! Challenge Dispatcher: one pipeline task per reachable miner.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::pipeline::VerificationPipeline;
use crate::store::DiscoveryStore;
use crate::types::{ChallengeOutcome, MinerRecord, RejectReason, Uid};

/// Outcomes of one dispatch round, keyed by uid.
pub type Outcomes = BTreeMap<Uid, ChallengeOutcome>;

pub struct ChallengeDispatcher {
    pipeline: VerificationPipeline,
    discoveries: Arc<dyn DiscoveryStore>,
}

impl ChallengeDispatcher {
    pub fn new(pipeline: VerificationPipeline, discoveries: Arc<dyn DiscoveryStore>) -> Self {
        Self {
            pipeline,
            discoveries,
        }
    }

    pub fn pipeline(&self) -> &VerificationPipeline {
        &self.pipeline
    }

    /// Record every miner's rank, then challenge all reachable miners
    /// concurrently. Unreachable miners are absent from the result.
    pub async fn dispatch(&self, registry: &[MinerRecord]) -> Outcomes {
        for miner in registry {
            if let Err(e) = self
                .discoveries
                .update_rank(&miner.ledger_key, &miner.display_name, miner.emission)
                .await
            {
                warn!(miner_key = %miner.ledger_key, error = %e, "Failed to record miner rank");
            }
        }

        let mut tasks = JoinSet::new();
        let mut challenged: Vec<Uid> = Vec::with_capacity(registry.len());

        for miner in registry {
            if miner.network_address().is_none() {
                debug!(uid = miner.uid, address = %miner.address, "Miner unreachable, skipping");
                continue;
            }

            challenged.push(miner.uid);
            let pipeline = self.pipeline.clone();
            let miner = miner.clone();
            tasks.spawn(async move {
                let outcome = pipeline.challenge(&miner).await;
                (miner.uid, outcome)
            });
        }

        let mut outcomes = Outcomes::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((uid, outcome)) => {
                    outcomes.insert(uid, outcome);
                }
                Err(e) => error!(error = %e, "Challenge task failed"),
            }
        }

        for uid in challenged {
            outcomes.entry(uid).or_insert_with(|| {
                ChallengeOutcome::rejected(RejectReason::TaskFailed("challenge task aborted".into()))
            });
        }

        outcomes
    }
}
