//! Node configuration
//!
//! Loaded from a TOML file with one section per collaborator. Secrets never
//! live in the file; they come from the environment after the env file has
//! been loaded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;
use vouch_validator::{ScoringPolicy, ValidatorConfig};

pub const ENV_VALIDATOR_KEY: &str = "VOUCH_VALIDATOR_KEY";
pub const ENV_SOCIAL_TOKENS: &str = "VOUCH_SOCIAL_BEARER_TOKENS";
pub const ENV_SENTIMENT_API_KEY: &str = "VOUCH_SENTIMENT_API_KEY";

/// Vouch validator - challenges miners and votes weights on the ledger
#[derive(Parser, Debug, Clone)]
#[command(name = "vouch-node")]
#[command(about = "Validator daemon for the Vouch subnet")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "VOUCH_CONFIG", default_value = "vouch-validator.toml")]
    pub config: PathBuf,

    /// Env file with secrets (defaults to env/.env.validator.<network>)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Network the validator runs on
    #[arg(long, value_enum, env = "VOUCH_NETWORK", default_value_t = Network::Mainnet)]
    pub network: Network,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Env file to load: explicit, else the per-network default.
    pub fn env_file_path(&self) -> PathBuf {
        self.env_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("env/.env.validator.{}", self.network.as_str())))
    }

    /// Load the env file into the process environment. Runs before logging
    /// is set up so `RUST_LOG` can come from the file; the caller logs the
    /// outcome.
    ///
    /// Returns the path when loaded, `None` when the per-network default is
    /// absent, and an error when an explicit `--env-file` cannot be read.
    pub fn load_env_file(&self) -> anyhow::Result<Option<PathBuf>> {
        let path = self.env_file_path();
        match dotenvy::from_path(&path) {
            Ok(()) => Ok(Some(path)),
            Err(e) if self.env_file.is_some() => {
                bail!("Failed to load env file {}: {}", path.display(), e)
            }
            Err(_) => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub social: SocialConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scoring: ScoringPolicy,
}

/// Ledger gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Base URL of the ledger gateway
    #[serde(default = "default_ledger_url")]
    pub url: String,

    #[serde(default = "default_ledger_timeout")]
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            url: default_ledger_url(),
            timeout_secs: default_ledger_timeout(),
        }
    }
}

/// Social media API and its credential pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    #[serde(default = "default_social_url")]
    pub base_url: String,

    /// Bearer tokens, filled from the environment
    #[serde(default, skip_serializing)]
    pub bearer_tokens: String,

    /// Calls allowed per credential per window
    #[serde(default = "default_calls_per_window")]
    pub calls_per_window: usize,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            base_url: default_social_url(),
            bearer_tokens: String::new(),
            calls_per_window: default_calls_per_window(),
            window_secs: default_window_secs(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl SocialConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// OpenAI-compatible sentiment model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    #[serde(default = "default_sentiment_url")]
    pub base_url: String,

    #[serde(default = "default_sentiment_model")]
    pub model: String,

    /// Filled from the environment; local servers may not need one
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            base_url: default_sentiment_url(),
            model: default_sentiment_model(),
            api_key: None,
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the database and the weight file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

// Defaults
fn default_ledger_url() -> String { "http://127.0.0.1:9944".to_string() }
fn default_ledger_timeout() -> u64 { 30 }
fn default_social_url() -> String { vouch_social::client::DEFAULT_BASE_URL.to_string() }
fn default_calls_per_window() -> usize { 15 }
fn default_window_secs() -> u64 { 15 * 60 }
fn default_http_timeout() -> u64 { 30 }
fn default_sentiment_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_sentiment_model() -> String { "gpt-4o-mini".to_string() }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }

impl Config {
    /// Read `path`, or fall back to defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Fill secrets from `lookup` (normally the process environment).
    pub fn apply_secrets<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_VALIDATOR_KEY) {
            self.validator.validator_key = key.trim().to_string();
        }
        if let Some(tokens) = lookup(ENV_SOCIAL_TOKENS) {
            self.social.bearer_tokens = tokens;
        }
        if let Some(api_key) = lookup(ENV_SENTIMENT_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.sentiment.api_key = Some(api_key);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.validator.validate()?;
        self.scoring.validate()?;

        if !self.social.bearer_tokens.split(';').any(|t| !t.trim().is_empty()) {
            bail!("{} must contain at least one token", ENV_SOCIAL_TOKENS);
        }
        if self.social.calls_per_window == 0 || self.social.window_secs == 0 {
            bail!("social.calls_per_window and social.window_secs must be greater than 0");
        }
        if self.ledger.url.trim().is_empty() {
            bail!("ledger.url must be set");
        }
        if self.sentiment.model.trim().is_empty() {
            bail!("sentiment.model must be set");
        }
        Ok(())
    }
}
