//! SQLite-backed receipts, discoveries and content blacklist.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{schema, ContentBlacklist, DiscoveryStore, ReceiptStore, StoreError};
use crate::similarity::max_similarity;
use crate::types::{EngagementMetrics, EvidenceRecord, ProfileMetrics, Uid};

/// Validator database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create `validator.db` in `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("validator.db");
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("Opening in-memory SQLite database");
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Number of stored receipts.
    pub fn receipt_count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM receipts", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
    }

    /// Stored emission for a miner, if any.
    pub fn miner_emission(&self, miner_key: &str) -> Result<Option<f64>, StoreError> {
        self.with_conn(|conn| {
            let emission = conn
                .query_row(
                    "SELECT emission FROM discoveries WHERE miner_key = ?1",
                    [miner_key],
                    |row| row.get::<_, Option<f64>>(0),
                )
                .optional()?;
            Ok(emission.flatten())
        })
    }
}

fn window_start(window_days: u32) -> i64 {
    (Utc::now() - Duration::days(i64::from(window_days))).timestamp()
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn max_or(value: Option<i64>, floor: u64) -> u64 {
    value.map(|v| v.max(0) as u64).unwrap_or(floor)
}

#[async_trait]
impl ReceiptStore for SqliteStore {
    async fn is_content_scored(&self, content_id: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM receipts WHERE content_id = ?1",
                    [content_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    async fn record_receipt(&self, evidence: &EvidenceRecord, score: f64) -> Result<bool, StoreError> {
        let e = &evidence.engagement;

        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO receipts (
                    content_id, miner_key, author_id, content_text, content_created_at,
                    amplification, replies, likes, quotes, bookmarks, impressions,
                    similarity, positivity, score, scored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    evidence.content_id,
                    evidence.miner_key,
                    evidence.author_id,
                    evidence.content_text,
                    evidence.created_at.timestamp(),
                    to_sql_int(e.amplification),
                    to_sql_int(e.replies),
                    to_sql_int(e.likes),
                    to_sql_int(e.quotes),
                    to_sql_int(e.bookmarks),
                    to_sql_int(e.impressions),
                    evidence.similarity,
                    evidence.positivity,
                    score,
                    Utc::now().timestamp(),
                ],
            )?;

            if inserted == 0 {
                debug!(content_id = %evidence.content_id, "Receipt already recorded");
            }
            Ok(inserted > 0)
        })
    }

    async fn similarity_against_window(&self, text: &str, window_days: u32) -> Result<f64, StoreError> {
        let texts = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT content_text FROM receipts WHERE scored_at >= ?1")?;
            let rows = stmt.query_map([window_start(window_days)], |row| row.get::<_, String>(0))?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })?;

        Ok(max_similarity(text, texts.iter().map(String::as_str)))
    }

    async fn engagement_maxima(&self, window_days: u32) -> Result<EngagementMetrics, StoreError> {
        self.with_conn(|conn| {
            let floor = EngagementMetrics::FLOOR;
            let maxima = conn.query_row(
                "SELECT MAX(amplification), MAX(replies), MAX(likes), MAX(quotes),
                        MAX(bookmarks), MAX(impressions)
                 FROM receipts WHERE scored_at >= ?1",
                [window_start(window_days)],
                |row| {
                    Ok(EngagementMetrics {
                        amplification: max_or(row.get(0)?, floor.amplification),
                        replies: max_or(row.get(1)?, floor.replies),
                        likes: max_or(row.get(2)?, floor.likes),
                        quotes: max_or(row.get(3)?, floor.quotes),
                        bookmarks: max_or(row.get(4)?, floor.bookmarks),
                        impressions: max_or(row.get(5)?, floor.impressions),
                    })
                },
            )?;
            Ok(maxima)
        })
    }
}

#[async_trait]
impl DiscoveryStore for SqliteStore {
    async fn update_rank(&self, miner_key: &str, miner_name: &str, emission: f64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO discoveries (miner_key, miner_name, emission) VALUES (?1, ?2, ?3)
                 ON CONFLICT(miner_key) DO UPDATE SET
                    miner_name = excluded.miner_name,
                    emission = excluded.emission",
                params![miner_key, miner_name, emission],
            )?;
            Ok(())
        })
    }

    async fn record_discovery(&self, uid: Uid, evidence: &EvidenceRecord) -> Result<(), StoreError> {
        let p = &evidence.profile;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO discoveries (
                    miner_key, uid, miner_name, author_id, author_name,
                    followers, following, posts, likes, listed, discovered_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(miner_key) DO UPDATE SET
                    uid = excluded.uid,
                    miner_name = excluded.miner_name,
                    author_id = excluded.author_id,
                    author_name = excluded.author_name,
                    followers = excluded.followers,
                    following = excluded.following,
                    posts = excluded.posts,
                    likes = excluded.likes,
                    listed = excluded.listed,
                    discovered_at = excluded.discovered_at",
                params![
                    evidence.miner_key,
                    uid,
                    evidence.miner_name,
                    evidence.author_id,
                    evidence.author_name,
                    to_sql_int(p.followers),
                    to_sql_int(p.following),
                    to_sql_int(p.posts),
                    to_sql_int(p.likes),
                    to_sql_int(p.listed),
                    Utc::now().timestamp(),
                ],
            )?;
            Ok(())
        })
    }

    async fn profile_maxima(&self, window_days: u32) -> Result<ProfileMetrics, StoreError> {
        self.with_conn(|conn| {
            let floor = ProfileMetrics::FLOOR;
            let maxima = conn.query_row(
                "SELECT MAX(followers), MAX(following), MAX(posts), MAX(likes), MAX(listed)
                 FROM discoveries WHERE discovered_at >= ?1",
                [window_start(window_days)],
                |row| {
                    Ok(ProfileMetrics {
                        followers: max_or(row.get(0)?, floor.followers),
                        following: max_or(row.get(1)?, floor.following),
                        posts: max_or(row.get(2)?, floor.posts),
                        likes: max_or(row.get(3)?, floor.likes),
                        listed: max_or(row.get(4)?, floor.listed),
                    })
                },
            )?;
            Ok(maxima)
        })
    }
}

#[async_trait]
impl ContentBlacklist for SqliteStore {
    async fn is_blacklisted(&self, content_id: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM content_blacklist WHERE content_id = ?1",
                    [content_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    async fn blacklist(&self, content_id: &str, reason: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO content_blacklist (content_id, reason, blacklisted_at)
                 VALUES (?1, ?2, ?3)",
                params![content_id, reason, Utc::now().timestamp()],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(content_id: &str, text: &str) -> EvidenceRecord {
        EvidenceRecord {
            content_id: content_id.into(),
            author_id: "42".into(),
            author_name: "alice".into(),
            miner_key: "miner-a".into(),
            miner_name: "Miner A".into(),
            profile: ProfileMetrics {
                followers: 2_500,
                following: 300,
                posts: 900,
                likes: 4_000,
                listed: 12,
            },
            engagement: EngagementMetrics {
                amplification: 7,
                replies: 3,
                likes: 40,
                quotes: 1,
                bookmarks: 2,
                impressions: 5_000,
            },
            content_text: text.into(),
            created_at: Utc::now(),
            similarity: 0.0,
            positivity: 75.0,
        }
    }

    #[tokio::test]
    async fn test_receipt_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = evidence("100", "vouching for the network");

        assert!(!store.is_content_scored("100").await.unwrap());
        assert!(store.record_receipt(&record, 40.0).await.unwrap());
        assert!(!store.record_receipt(&record, 55.0).await.unwrap());

        assert!(store.is_content_scored("100").await.unwrap());
        assert_eq!(store.receipt_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_maxima_fall_back_to_floor() {
        let store = SqliteStore::open_in_memory().unwrap();

        assert_eq!(store.profile_maxima(30).await.unwrap(), ProfileMetrics::FLOOR);
        assert_eq!(store.engagement_maxima(30).await.unwrap(), EngagementMetrics::FLOOR);
    }

    #[tokio::test]
    async fn test_maxima_from_history() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = evidence("100", "vouching for the network");

        store.record_receipt(&record, 40.0).await.unwrap();
        store.record_discovery(3, &record).await.unwrap();

        let engagement = store.engagement_maxima(30).await.unwrap();
        assert_eq!(engagement, record.engagement);

        let profile = store.profile_maxima(30).await.unwrap();
        assert_eq!(profile, record.profile);
    }

    #[tokio::test]
    async fn test_rank_only_rows_do_not_affect_maxima() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.update_rank("miner-b", "Miner B", 12.5).await.unwrap();
        store.update_rank("miner-b", "Miner B", 13.0).await.unwrap();

        assert_eq!(store.miner_emission("miner-b").unwrap(), Some(13.0));
        assert_eq!(store.profile_maxima(30).await.unwrap(), ProfileMetrics::FLOOR);
    }

    #[tokio::test]
    async fn test_similarity_against_window() {
        let store = SqliteStore::open_in_memory().unwrap();

        assert_eq!(store.similarity_against_window("anything", 30).await.unwrap(), 0.0);

        store
            .record_receipt(&evidence("1", "the decentralized future is bright"), 10.0)
            .await
            .unwrap();

        let same = store
            .similarity_against_window("The decentralized future is bright!", 30)
            .await
            .unwrap();
        assert_eq!(same, 1.0);

        let other = store.similarity_against_window("xyz", 30).await.unwrap();
        assert_eq!(other, 0.0);
    }

    #[tokio::test]
    async fn test_content_blacklist() {
        let store = SqliteStore::open_in_memory().unwrap();

        assert!(!store.is_blacklisted("55").await.unwrap());
        store.blacklist("55", "author_mismatch").await.unwrap();
        store.blacklist("55", "author_mismatch").await.unwrap();
        assert!(store.is_blacklisted("55").await.unwrap());
    }

    #[tokio::test]
    async fn test_reopen_keeps_receipts() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = SqliteStore::open(dir.path()).unwrap();
            store.record_receipt(&evidence("7", "hello"), 1.0).await.unwrap();
        }

        let store = SqliteStore::open(dir.path()).unwrap();
        assert!(store.is_content_scored("7").await.unwrap());
    }
}
