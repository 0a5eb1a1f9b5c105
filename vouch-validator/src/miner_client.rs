//! Claim source: asks a miner which content it wants credit for.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Claim, MinerRecord, NetworkAddress};

/// Header carrying the challenging validator's ledger key.
pub const VALIDATOR_KEY_HEADER: &str = "x-validator-key";

/// Error types for claim fetching.
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// Miner has no usable address
    #[error("Miner unreachable: {0}")]
    Unreachable(String),

    /// Connection failure or timeout
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Miner answered with an error status
    #[error("Request failed: HTTP {status}")]
    RequestFailed { status: u16 },

    /// Malformed response body
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Source of a miner's claims for the current iteration.
#[async_trait]
pub trait ClaimSource: Send + Sync {
    /// Claims in the miner's preferred order.
    async fn fetch_claims(&self, miner: &MinerRecord) -> Result<Vec<Claim>, ClaimError>;
}

#[derive(Debug, Serialize)]
struct DiscoveryRequest<'a> {
    miner_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(default)]
    claims: Vec<Claim>,
}

/// Challenges miners over HTTP at `http://{host}:{port}/method/discovery`.
pub struct HttpClaimSource {
    client: Client,
    validator_key: String,
}

impl HttpClaimSource {
    /// `timeout` bounds each miner call.
    pub fn new(validator_key: impl Into<String>, timeout: Duration) -> Result<Self, ClaimError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClaimError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            validator_key: validator_key.into(),
        })
    }

    fn discovery_url(address: &NetworkAddress) -> String {
        format!("http://{}/method/discovery", address)
    }
}

#[async_trait]
impl ClaimSource for HttpClaimSource {
    async fn fetch_claims(&self, miner: &MinerRecord) -> Result<Vec<Claim>, ClaimError> {
        let address = miner
            .network_address()
            .ok_or_else(|| ClaimError::Unreachable(miner.address.clone()))?;
        let url = Self::discovery_url(&address);

        debug!(miner_key = %miner.ledger_key, url = %url, "Requesting claims");

        let response = self
            .client
            .post(&url)
            .header(VALIDATOR_KEY_HEADER, &self.validator_key)
            .json(&DiscoveryRequest {
                miner_key: &miner.ledger_key,
            })
            .send()
            .await
            .map_err(|e| ClaimError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClaimError::RequestFailed {
                status: status.as_u16(),
            });
        }

        let body: DiscoveryResponse = response
            .json()
            .await
            .map_err(|e| ClaimError::ParseError(e.to_string()))?;

        Ok(body.claims)
    }
}
