//! vouch-node: validator daemon for the Vouch subnet
//!
//! Loads configuration and secrets, wires the validator to the ledger
//! gateway, the social API, the sentiment model and local storage, then runs
//! the validation loop until SIGINT or SIGTERM.

pub mod app;
pub mod config;
pub mod ledger_client;
pub mod logging;

pub use config::{Cli, Config, LogFormat, Network};
pub use ledger_client::HttpLedgerClient;
