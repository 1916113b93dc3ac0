use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub mod models;

/// Thread-safe SQLite handle (single connection with mutex) backing the
/// recently-sent cooldown table.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path.
    /// `":memory:"` gives a throwaway database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        if path != ":memory:" {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Cooldown ──────────────────────────────────────────────────────────────

    /// True when `key` was marked strictly after `now - minutes`.
    pub fn was_sent_recently(&self, key: &str, minutes: u64, now: DateTime<Utc>) -> Result<bool> {
        let cutoff = now.timestamp() - (minutes as i64) * 60;
        let conn = self.conn.lock().unwrap();
        let ts: Option<i64> = conn
            .query_row("SELECT ts FROM sent WHERE id = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(ts.is_some_and(|ts| ts > cutoff))
    }

    pub fn mark_sent(&self, key: &str, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO sent (id, ts) VALUES (?1, ?2)",
            params![key, now.timestamp()],
        )?;
        Ok(())
    }

    /// Delete keys older than the given age. Returns rows removed.
    pub fn prune_sent(&self, older_than_minutes: u64, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now.timestamp() - (older_than_minutes as i64) * 60;
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM sent WHERE ts <= ?1", params![cutoff])?;
        Ok(n)
    }

    pub fn count_sent(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let n = conn.query_row("SELECT COUNT(*) FROM sent", [], |r| r.get(0))?;
        Ok(n)
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sent (
    id TEXT    PRIMARY KEY,
    ts INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sent_ts ON sent(ts);
"#;
