//! Ledger contract: miner registry and weight votes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{MinerRecord, Uid};

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Ledger endpoint unreachable
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Ledger rejected the request
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Unexpected response shape
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Vote was malformed before submission
    #[error("Invalid vote: {0}")]
    InvalidVote(String),
}

/// A weight vote. `uids[i]` receives `weights[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub network_id: u16,
    pub uids: Vec<Uid>,
    pub weights: Vec<u16>,
}

impl Vote {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.uids.len() != self.weights.len() {
            return Err(LedgerError::InvalidVote(format!(
                "{} uids but {} weights",
                self.uids.len(),
                self.weights.len()
            )));
        }
        if self.uids.is_empty() {
            return Err(LedgerError::InvalidVote("empty vote".into()));
        }
        Ok(())
    }
}

/// Query and vote interface of the shared ledger.
///
/// Implementations hold the validator's signing key and sign votes themselves.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Every registered module on the network.
    async fn list_miners(&self, network_id: u16) -> Result<Vec<MinerRecord>, LedgerError>;

    /// Submit a signed weight vote.
    async fn submit_vote(&self, vote: &Vote) -> Result<(), LedgerError>;
}

/// In-memory ledger for tests and dry runs.
#[derive(Default)]
pub struct MemoryLedger {
    miners: Mutex<Vec<MinerRecord>>,
    votes: Mutex<Vec<Vote>>,
    fail_votes: AtomicBool,
    fail_listing: AtomicBool,
}

impl MemoryLedger {
    pub fn new(miners: Vec<MinerRecord>) -> Self {
        Self {
            miners: Mutex::new(miners),
            ..Default::default()
        }
    }

    /// Make every vote submission fail.
    pub fn with_failing_votes(self) -> Self {
        self.fail_votes.store(true, Ordering::SeqCst);
        self
    }

    /// Make registry listing fail.
    pub fn with_failing_listing(self) -> Self {
        self.fail_listing.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_miners(&self, miners: Vec<MinerRecord>) {
        if let Ok(mut current) = self.miners.lock() {
            *current = miners;
        }
    }

    /// Votes accepted so far, oldest first.
    pub fn votes(&self) -> Vec<Vote> {
        self.votes.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn list_miners(&self, _network_id: u16) -> Result<Vec<MinerRecord>, LedgerError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(LedgerError::NetworkError("ledger unreachable".into()));
        }

        self.miners
            .lock()
            .map(|m| m.clone())
            .map_err(|e| LedgerError::RequestFailed(format!("Lock poisoned: {}", e)))
    }

    async fn submit_vote(&self, vote: &Vote) -> Result<(), LedgerError> {
        vote.validate()?;

        if self.fail_votes.load(Ordering::SeqCst) {
            return Err(LedgerError::RequestFailed("vote rejected".into()));
        }

        self.votes
            .lock()
            .map_err(|e| LedgerError::RequestFailed(format!("Lock poisoned: {}", e)))?
            .push(vote.clone());
        Ok(())
    }
}
