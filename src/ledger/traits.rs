// Ledger trait — the dedup store behind the bounded repost run.
//
// Implementors: FileLedger (newline-delimited text), SqliteLedger (rusqlite),
// MemoryLedger (tests). Each backend loads its state when opened; a missing
// backing store means an empty ledger, not an error.
//
// Methods are synchronous. Both real backends do blocking I/O on small data,
// and the run calls them between awaits on a single task.

use anyhow::Result;

pub trait DedupLedger: Send {
    /// Whether this location reference was already acted on.
    fn contains(&self, uri: &str) -> bool;

    /// Mark a location reference as acted on.
    ///
    /// The in-memory set is updated even when persisting the entry fails;
    /// the error only reports that the entry is not yet durable.
    fn record(&mut self, uri: &str) -> Result<()>;

    /// Persist the full current set, replacing earlier content.
    fn flush(&mut self) -> Result<()>;

    /// Number of references currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short backend name for status output.
    fn backend(&self) -> &'static str;
}
