//! Weight Aggregator: scores to a ledger vote.

use std::sync::Arc;

use tracing::info;

use crate::ledger::{Ledger, Vote};
use crate::store::WeightStore;
use crate::types::{Result, ScoreMap, Uid, WeightMap};

/// Total weight a vote distributes, before rounding down.
pub const WEIGHT_SCALE: f64 = 1000.0;

/// Keep the `max_entries` highest scores. Equal scores keep the lower uid.
pub fn cap_scores(scores: &ScoreMap, max_entries: usize) -> ScoreMap {
    let mut ranked: Vec<(Uid, f64)> = scores.iter().map(|(uid, score)| (*uid, *score)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(max_entries);
    ranked.into_iter().collect()
}

/// Merge integer weights for `capped` into `previous`, then drop every uid
/// not in `capped`.
pub fn compute_weights(capped: &ScoreMap, previous: WeightMap) -> WeightMap {
    let total: f64 = capped.values().map(|s| s.max(0.0)).sum();
    let mut merged = previous;

    for (uid, score) in capped {
        let weight = if total > 0.0 {
            (score.max(0.0) * WEIGHT_SCALE / total).floor().min(WEIGHT_SCALE) as u16
        } else {
            0
        };
        merged.insert(*uid, weight);
    }

    merged.retain(|uid, _| capped.contains_key(uid));
    merged
}

/// Turns a score map into a persisted weight map and a ledger vote.
pub struct WeightAggregator {
    store: Arc<dyn WeightStore>,
    ledger: Arc<dyn Ledger>,
    network_id: u16,
    max_allowed_weights: usize,
}

impl WeightAggregator {
    pub fn new(
        store: Arc<dyn WeightStore>,
        ledger: Arc<dyn Ledger>,
        network_id: u16,
        max_allowed_weights: usize,
    ) -> Self {
        Self {
            store,
            ledger,
            network_id,
            max_allowed_weights,
        }
    }

    /// Cap, weigh, persist and vote. Returns the vote, or `None` when there
    /// was nothing to vote on.
    pub async fn submit(&self, scores: &ScoreMap) -> Result<Option<Vote>> {
        let capped = cap_scores(scores, self.max_allowed_weights);
        let previous = self.store.load().await?;
        let weights = compute_weights(&capped, previous);

        self.store.store(&weights).await?;

        if weights.is_empty() {
            info!("No weights to submit");
            return Ok(None);
        }

        let vote = Vote {
            network_id: self.network_id,
            uids: weights.keys().copied().collect(),
            weights: weights.values().copied().collect(),
        };
        self.ledger.submit_vote(&vote).await?;

        info!(
            network_id = self.network_id,
            entries = vote.uids.len(),
            total_weight = vote.weights.iter().map(|w| u32::from(*w)).sum::<u32>(),
            "Submitted weights"
        );
        Ok(Some(vote))
    }
}
