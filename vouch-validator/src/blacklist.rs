//! Process-lifetime miner blacklist.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::warn;

use crate::types::RejectReason;

/// Why and when a miner was excluded.
#[derive(Debug, Clone)]
pub struct BlacklistEntry {
    pub reason: RejectReason,
    pub since: DateTime<Utc>,
}

/// Concurrent set of excluded miner keys, shared by every pipeline task.
///
/// Not persisted: a restart clears it.
#[derive(Debug, Clone, Default)]
pub struct MinerBlacklist {
    entries: Arc<DashMap<String, BlacklistEntry>>,
}

impl MinerBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, miner_key: &str) -> bool {
        self.entries.contains_key(miner_key)
    }

    /// Exclude a miner. The first reason recorded is kept.
    pub fn insert(&self, miner_key: &str, reason: RejectReason) {
        self.entries
            .entry(miner_key.to_string())
            .or_insert_with(|| {
                warn!(miner_key = %miner_key, reason = %reason, "Blacklisting miner");
                BlacklistEntry {
                    reason,
                    since: Utc::now(),
                }
            });
    }

    pub fn get(&self, miner_key: &str) -> Option<BlacklistEntry> {
        self.entries.get(miner_key).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let blacklist = MinerBlacklist::new();
        assert!(!blacklist.contains("miner-a"));

        blacklist.insert("miner-a", RejectReason::AuthorNotVerified);
        assert!(blacklist.contains("miner-a"));
        assert_eq!(blacklist.len(), 1);
    }

    #[test]
    fn test_first_reason_kept() {
        let blacklist = MinerBlacklist::new();
        blacklist.insert("miner-a", RejectReason::AuthorNotVerified);
        blacklist.insert("miner-a", RejectReason::AuthorMismatch);

        assert_eq!(blacklist.get("miner-a").unwrap().reason, RejectReason::AuthorNotVerified);
        assert_eq!(blacklist.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts() {
        let blacklist = MinerBlacklist::new();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let blacklist = blacklist.clone();
                tokio::spawn(async move {
                    blacklist.insert(&format!("miner-{}", i % 8), RejectReason::AuthorMismatch);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(blacklist.len(), 8);
    }
}
