// Selection policies — decide which accepted records are acted on, and in
// what order.
//
// Two policies:
// - `select_backlog`: oldest first, capped per author and per run. The
//   bounded repost run applies the same caps to successful reposts while it
//   walks `order_backlog`, and uses `select_backlog` for its dry-run plan.
// - `select_latest_per_author`: first (newest) record per author in native
//   feed order, capped by number of authors. Used by the replace-and-promote
//   run, which needs no ledger.

use std::collections::{HashMap, HashSet};

use super::models::{FeedEntry, PostRecord, PriorActions};

/// Per-author and per-run caps for the backlog policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacklogLimits {
    pub max_per_author: usize,
    pub max_per_run: usize,
}

/// In-memory counter of actions per author for a single run.
#[derive(Debug, Default)]
pub struct AuthorQuota {
    counts: HashMap<String, usize>,
    cap: usize,
}

impl AuthorQuota {
    pub fn new(cap: usize) -> Self {
        Self {
            counts: HashMap::new(),
            cap,
        }
    }

    pub fn has_room(&self, author_key: &str) -> bool {
        self.count(author_key) < self.cap
    }

    pub fn count(&self, author_key: &str) -> usize {
        self.counts.get(author_key).copied().unwrap_or(0)
    }

    pub fn consume(&mut self, author_key: &str) {
        *self.counts.entry(author_key.to_string()).or_insert(0) += 1;
    }
}

/// Drop records already in the ledger, and repeats of the same location
/// reference within one batch (first occurrence wins).
pub fn exclude_seen<F>(records: Vec<PostRecord>, already_done: F) -> Vec<PostRecord>
where
    F: Fn(&str) -> bool,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| !already_done(r.uri()) && seen.insert(r.uri().to_string()))
        .collect()
}

/// Processing order for the backlog: oldest first. Ties in `created_at` keep
/// feed-arrival order (the sort is stable).
pub fn order_backlog(mut records: Vec<PostRecord>) -> Vec<PostRecord> {
    records.sort_by_key(|r| r.created_at);
    records
}

/// Oldest-first admission with per-author and per-run caps, assuming every
/// admitted record is acted on. The output stays in ascending time order.
pub fn select_backlog(records: Vec<PostRecord>, limits: BacklogLimits) -> Vec<PostRecord> {
    let mut quota = AuthorQuota::new(limits.max_per_author);
    let mut admitted = Vec::new();

    for record in order_backlog(records) {
        if admitted.len() >= limits.max_per_run {
            break;
        }
        if !quota.has_room(&record.author_key) {
            continue;
        }
        quota.consume(&record.author_key);
        admitted.push(record);
    }

    admitted
}

/// The newest record for an author, plus the viewer's own repost/like on
/// that author's other posts seen in the same fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestPick {
    pub post: PostRecord,
    pub superseded: Vec<SupersededPromotion>,
}

/// An older promotion by this account that the new one replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupersededPromotion {
    pub uri: String,
    pub actions: PriorActions,
}

/// Keep the first record per author in the given (newest-first) order, up
/// to `max_authors` authors.
pub fn select_latest_per_author(records: Vec<PostRecord>, max_authors: usize) -> Vec<PostRecord> {
    let mut authors = HashSet::new();
    let mut kept = Vec::new();

    for record in records {
        if kept.len() >= max_authors {
            break;
        }
        if authors.insert(record.author_key.clone()) {
            kept.push(record);
        }
    }

    kept
}

/// Attach superseded promotions to each selected post.
///
/// Scans every raw entry in the batch, including ones the filter rejected,
/// since an older promoted post may no longer qualify.
pub fn attach_superseded(picks: Vec<PostRecord>, entries: &[FeedEntry]) -> Vec<LatestPick> {
    picks
        .into_iter()
        .map(|post| {
            let mut seen = HashSet::new();
            let superseded = entries
                .iter()
                .filter(|e| e.author_did == post.author_key && e.uri != post.id.uri)
                .filter(|e| !e.viewer.is_empty())
                .filter(|e| seen.insert(e.uri.clone()))
                .map(|e| SupersededPromotion {
                    uri: e.uri.clone(),
                    actions: e.viewer.clone(),
                })
                .collect();
            LatestPick { post, superseded }
        })
        .collect()
}
