// MemoryLedger — in-memory ledger for tests and dry runs.

use anyhow::Result;
use std::collections::HashSet;

use super::traits::DedupLedger;

#[derive(Debug, Default)]
pub struct MemoryLedger {
    done: HashSet<String>,
    /// Number of times `flush` was called.
    pub flushes: usize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            done: entries.into_iter().map(Into::into).collect(),
            flushes: 0,
        }
    }

    pub fn entries(&self) -> &HashSet<String> {
        &self.done
    }
}

impl DedupLedger for MemoryLedger {
    fn contains(&self, uri: &str) -> bool {
        self.done.contains(uri)
    }

    fn record(&mut self, uri: &str) -> Result<()> {
        self.done.insert(uri.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.done.len()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
