//! HTTP client for the ledger gateway.
//!
//! - `GET  {url}/subnets/{netuid}/modules` lists registered modules
//! - `POST {url}/subnets/{netuid}/weights` submits a vote signed by the
//!   gateway on behalf of `key`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vouch_validator::{Ledger, LedgerError, MinerRecord, Uid, Vote};

pub struct HttpLedgerClient {
    client: Client,
    base_url: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    uid: Uid,
    key: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    emission: f64,
}

#[derive(Debug, Serialize)]
struct WeightsRequest<'a> {
    key: &'a str,
    uids: &'a [Uid],
    weights: &'a [u16],
}

impl HttpLedgerClient {
    pub fn new(base_url: impl Into<String>, key: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key: key.into(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, LedgerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(LedgerError::RequestFailed(format!("HTTP {}: {}", status, body)))
    }
}

#[async_trait]
impl Ledger for HttpLedgerClient {
    async fn list_miners(&self, network_id: u16) -> Result<Vec<MinerRecord>, LedgerError> {
        let url = format!("{}/subnets/{}/modules", self.base_url, network_id);
        debug!(url = %url, "Listing modules");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::NetworkError(e.to_string()))?;

        let modules: Vec<ModuleEntry> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| LedgerError::ParseError(e.to_string()))?;

        Ok(modules
            .into_iter()
            .map(|m| MinerRecord {
                uid: m.uid,
                ledger_key: m.key,
                display_name: m.name,
                address: m.address,
                emission: m.emission,
            })
            .collect())
    }

    async fn submit_vote(&self, vote: &Vote) -> Result<(), LedgerError> {
        vote.validate()?;

        let url = format!("{}/subnets/{}/weights", self.base_url, vote.network_id);
        let body = WeightsRequest {
            key: &self.key,
            uids: &vote.uids,
            weights: &vote.weights,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::NetworkError(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }
}
