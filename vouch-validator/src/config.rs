//! Configuration for the validation loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{Result, ValidatorError};

/// Validator loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Subnet the validator votes on
    #[serde(default = "default_network_id")]
    pub network_id: u16,

    /// This validator's ledger key. Supplied from the environment.
    #[serde(default, skip_serializing)]
    pub validator_key: String,

    /// Seconds from one iteration start to the next
    #[serde(default = "default_iteration_interval")]
    pub iteration_interval_secs: u64,

    /// Maximum uids in a single vote
    #[serde(default = "default_max_allowed_weights")]
    pub max_allowed_weights: usize,

    /// Timeout for each miner challenge call, in seconds
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            network_id: default_network_id(),
            validator_key: String::new(),
            iteration_interval_secs: default_iteration_interval(),
            max_allowed_weights: default_max_allowed_weights(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

impl ValidatorConfig {
    pub fn iteration_interval(&self) -> Duration {
        Duration::from_secs(self.iteration_interval_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.validator_key.trim().is_empty() {
            return Err(ValidatorError::Config("validator key is not set".into()));
        }
        if self.iteration_interval_secs == 0 {
            return Err(ValidatorError::Config(
                "validator.iteration_interval_secs must be greater than 0".into(),
            ));
        }
        if self.max_allowed_weights == 0 {
            return Err(ValidatorError::Config(
                "validator.max_allowed_weights must be at least 1".into(),
            ));
        }
        if self.query_timeout_secs == 0 {
            return Err(ValidatorError::Config(
                "validator.query_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_network_id() -> u16 { 0 }
fn default_iteration_interval() -> u64 { 600 }
fn default_max_allowed_weights() -> usize { 420 }
fn default_query_timeout() -> u64 { 60 }
