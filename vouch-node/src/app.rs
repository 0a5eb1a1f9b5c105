//! Wiring: configuration to a running validator.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use vouch_sentiment::{LlmBackend, LlmSentimentScorer, OpenAiBackend};
use vouch_social::{CredentialPool, RateLimit, XApiClient};
use vouch_validator::{
    Collaborators, FileWeightStore, HttpClaimSource, MinerBlacklist, Scheduler, SqliteStore, Validator,
};

use crate::config::Config;
use crate::ledger_client::HttpLedgerClient;

/// Build a validator over the real collaborators described by `config`.
/// An unreachable sentiment model is logged, not fatal.
pub async fn build_validator(config: &Config) -> anyhow::Result<Validator> {
    let limit = RateLimit {
        max_calls: config.social.calls_per_window,
        window: config.social.window(),
    };
    let pool = CredentialPool::from_token_list(&config.social.bearer_tokens, limit)
        .context("Failed to build social credential pool")?;
    info!(credentials = pool.len(), calls_per_window = limit.max_calls, "Social credential pool ready");

    let evidence = XApiClient::new(
        config.social.base_url.clone(),
        Arc::new(pool),
        Duration::from_secs(config.social.timeout_secs),
    )?;

    let backend = OpenAiBackend::new(
        config.sentiment.base_url.clone(),
        config.sentiment.model.clone(),
        config.sentiment.api_key.clone(),
        Duration::from_secs(config.sentiment.timeout_secs),
    )?;
    match backend.check_model().await {
        Ok(()) => info!(model = backend.model(), "Sentiment model available"),
        Err(e) => warn!(model = backend.model(), error = %e, "Sentiment model check failed"),
    }

    let ledger = HttpLedgerClient::new(
        config.ledger.url.clone(),
        config.validator.validator_key.clone(),
        Duration::from_secs(config.ledger.timeout_secs),
    )?;

    let claims = HttpClaimSource::new(config.validator.validator_key.clone(), config.validator.query_timeout())?;

    let store = Arc::new(
        SqliteStore::open(&config.storage.data_dir).context("Failed to open validator database")?,
    );
    let weights = FileWeightStore::in_dir(&config.storage.data_dir);
    info!(data_dir = %config.storage.data_dir.display(), "Storage ready");

    let parts = Collaborators {
        ledger: Arc::new(ledger),
        claims: Arc::new(claims),
        evidence: Arc::new(evidence),
        sentiment: Arc::new(LlmSentimentScorer::new(Arc::new(backend))),
        receipts: store.clone(),
        discoveries: store.clone(),
        content_blacklist: store,
        weights: Arc::new(weights),
        miner_blacklist: MinerBlacklist::new(),
    };

    Ok(Validator::new(config.validator.clone(), config.scoring.clone(), parts))
}

/// Scheduler driving `validator` at the configured interval.
pub fn build_scheduler(config: &Config, validator: Validator) -> Scheduler {
    Scheduler::new(Arc::new(validator), config.validator.iteration_interval())
}
