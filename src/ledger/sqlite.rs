// SqliteLedger — rusqlite-backed ledger for long-lived curators.
//
// Every recorded URI is inserted immediately, so the database is always the
// durable copy and `flush` has nothing left to write. The in-memory set is
// loaded once at open time, like the file backend.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;

use super::traits::DedupLedger;

pub struct SqliteLedger {
    conn: Connection,
    done: HashSet<String>,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory for ledger: {}", path.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open ledger database at {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Wrap an already-opened connection (used with in-memory databases).
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS reposted (
                uri TEXT PRIMARY KEY,              -- AT-URI of the reposted post
                recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )
        .context("Failed to create ledger table")?;

        let done = {
            let mut stmt = conn.prepare("SELECT uri FROM reposted")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<HashSet<_>>>()?
        };

        Ok(Self { conn, done })
    }
}

impl DedupLedger for SqliteLedger {
    fn contains(&self, uri: &str) -> bool {
        self.done.contains(uri)
    }

    fn record(&mut self, uri: &str) -> Result<()> {
        self.done.insert(uri.to_string());
        self.conn
            .execute(
                "INSERT OR IGNORE INTO reposted (uri) VALUES (?1)",
                params![uri],
            )
            .context("Failed to insert ledger entry")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // Entries are written as they are recorded; make sure the set on disk
        // matches memory in case an earlier insert failed.
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO reposted (uri) VALUES (?1)")?;
            for uri in &self.done {
                stmt.execute(params![uri])?;
            }
        }
        tx.commit().context("Failed to commit ledger")?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.done.len()
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
