// Dedup ledger — which posts this account already reposted.
//
// The ledger path picks the backend: `.db` / `.sqlite` files use SQLite
// (when the `sqlite` feature is on), anything else is a plain text file
// with one AT-URI per line.

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use traits::DedupLedger;

use anyhow::Result;
use std::path::Path;

/// Whether `path` names a SQLite ledger rather than a text file.
pub fn is_sqlite_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("db" | "sqlite" | "sqlite3")
    )
}

/// Open the ledger at `path`, choosing the backend from its extension.
pub fn open_ledger(path: &Path) -> Result<Box<dyn DedupLedger>> {
    if is_sqlite_path(path) {
        #[cfg(feature = "sqlite")]
        {
            return Ok(Box::new(sqlite::SqliteLedger::open(path)?));
        }
        #[cfg(not(feature = "sqlite"))]
        {
            anyhow::bail!(
                "Ledger {} looks like a SQLite database, but this build has no SQLite support.\n\
                 Rebuild with `--features sqlite` or use a .txt ledger path.",
                path.display()
            );
        }
    }

    Ok(Box::new(file::FileLedger::open(path)?))
}
