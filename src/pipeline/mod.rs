// Run pipelines: fetch -> filter -> select -> act -> persist.
//
// Two flavours:
// - `repost_run`: bounded, oldest-first backlog run with a dedup ledger.
// - `latest_run`: newest media post per author, replacing earlier promotions.
//
// Both are strictly sequential. One candidate's failure never stops a run;
// only a failed fetch does, and it does so before any write.

pub mod executor;
pub mod latest_run;
pub mod repost_run;

use std::collections::BTreeMap;

use crate::curation::filter::Rejection;
use crate::curation::models::PostRecord;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Raw entries returned by the feed source.
    pub fetched: usize,
    /// Entries that passed the candidate filter.
    pub accepted: usize,
    /// Accepted records not already in the ledger (repost run only).
    pub fresh: usize,
    pub rejections: BTreeMap<Rejection, usize>,
    /// Records acted on, in processing order. In a dry run, the plan.
    pub selected: Vec<PostRecord>,
    pub reposted: usize,
    pub liked: usize,
    /// Candidates whose repost failed.
    pub failed: usize,
    /// Candidates passed over because their author already reached the
    /// per-author cap with successful reposts.
    pub skipped: usize,
    /// Earlier reposts/likes removed (latest run only).
    pub reversed: usize,
    pub reversal_failures: usize,
    pub dry_run: bool,
}
