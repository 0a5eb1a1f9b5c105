//! Vouch Validator - the validation consensus loop
//!
//! Periodically challenges every registered miner for fresh evidence of
//! authored social content, verifies it, scores it and votes normalized
//! weights onto the ledger.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            Scheduler                             │
//! │                                │                                 │
//! │                      ┌─────────▼─────────┐                       │
//! │                      │     Validator     │◀── Ledger (registry)  │
//! │                      └─────────┬─────────┘                       │
//! │                                │                                 │
//! │                   ┌────────────▼────────────┐                    │
//! │                   │   Challenge Dispatcher  │                    │
//! │                   └──┬─────────┬─────────┬──┘                    │
//! │               ┌──────▼──┐ ┌────▼────┐ ┌──▼──────┐                │
//! │               │Pipeline │ │Pipeline │ │Pipeline │  one per miner │
//! │               └──────┬──┘ └────┬────┘ └──┬──────┘                │
//! │                      └─────────┼─────────┘                       │
//! │                      ┌─────────▼─────────┐                       │
//! │                      │   Score Engine    │◀── rolling maxima     │
//! │                      └─────────┬─────────┘                       │
//! │                      ┌─────────▼─────────┐                       │
//! │                      │ Weight Aggregator │──▶ Ledger (vote)      │
//! │                      └───────────────────┘                       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Shared state
//!
//! Pipelines share only the social client's credential windows, the
//! [`MinerBlacklist`] and the stores. Everything else is per task.

pub mod blacklist;
pub mod config;
pub mod dispatcher;
pub mod ledger;
pub mod miner_client;
pub mod ownership;
pub mod pipeline;
pub mod scheduler;
pub mod scoring;
pub mod similarity;
pub mod store;
pub mod types;
pub mod validator;
pub mod weights;

pub use blacklist::MinerBlacklist;
pub use config::ValidatorConfig;
pub use dispatcher::ChallengeDispatcher;
pub use ledger::{Ledger, LedgerError, MemoryLedger, Vote};
pub use miner_client::{ClaimError, ClaimSource, HttpClaimSource};
pub use pipeline::VerificationPipeline;
pub use scheduler::{IterationRunner, Scheduler, SchedulerState, StopHandle};
pub use scoring::{FreshnessDecay, ScoreEngine, ScoringPolicy};
pub use store::{
    ContentBlacklist, DiscoveryStore, FileWeightStore, MemoryWeightStore, ReceiptStore, SqliteStore,
    StoreError, WeightStore,
};
pub use types::*;
pub use validator::{Collaborators, IterationReport, Validator, VoteStatus};
pub use weights::WeightAggregator;
