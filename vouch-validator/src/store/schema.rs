//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use super::StoreError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let current_version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    if current_version == 0 {
        info!("Creating validator database schema v{}", SCHEMA_VERSION);
        conn.execute_batch(VALIDATOR_SCHEMA)?;
        conn.execute("INSERT INTO schema_version (version) VALUES (?)", [SCHEMA_VERSION])?;
    } else if current_version > SCHEMA_VERSION {
        return Err(StoreError::Internal(format!(
            "Database schema v{} is newer than supported v{}",
            current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

const VALIDATOR_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS receipts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_id TEXT NOT NULL UNIQUE,
    miner_key TEXT NOT NULL,
    author_id TEXT NOT NULL,
    content_text TEXT NOT NULL,
    content_created_at INTEGER NOT NULL,
    amplification INTEGER NOT NULL,
    replies INTEGER NOT NULL,
    likes INTEGER NOT NULL,
    quotes INTEGER NOT NULL,
    bookmarks INTEGER NOT NULL,
    impressions INTEGER NOT NULL,
    similarity REAL NOT NULL,
    positivity REAL NOT NULL,
    score REAL NOT NULL,
    scored_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_receipts_scored_at ON receipts(scored_at);
CREATE INDEX IF NOT EXISTS idx_receipts_miner_key ON receipts(miner_key);

CREATE TABLE IF NOT EXISTS discoveries (
    miner_key TEXT PRIMARY KEY,
    uid INTEGER,
    miner_name TEXT,
    emission REAL,
    author_id TEXT,
    author_name TEXT,
    followers INTEGER,
    following INTEGER,
    posts INTEGER,
    likes INTEGER,
    listed INTEGER,
    discovered_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_discoveries_discovered_at ON discoveries(discovered_at);

CREATE TABLE IF NOT EXISTS content_blacklist (
    content_id TEXT PRIMARY KEY,
    reason TEXT,
    blacklisted_at INTEGER NOT NULL
);
"#;
