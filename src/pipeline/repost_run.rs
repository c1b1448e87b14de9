// Bounded repost run — reposts the feed backlog oldest first.
//
// 1. Fetch one page from the source (failure aborts, nothing is written)
// 2. Filter by shape and time window
// 3. Drop posts already in the ledger
// 4. Walk the fresh posts oldest first; caps per author and per run count
//    successful reposts, so a failed post frees its slot for the next one
// 5. Repost + like each one with a fixed delay in between
// 6. Flush the ledger once
//
// A dry run stops after step 3 and reports the plan `select_backlog` makes
// assuming every repost succeeds.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};

use super::executor::{promote, Pacer};
use super::RunSummary;
use crate::bluesky::actions::RemoteActions;
use crate::bluesky::feed::{fetch_entries, FeedSource, SourceSpec};
use crate::curation::filter::{filter_entries, FilterRules};
use crate::curation::select::{
    exclude_seen, order_backlog, select_backlog, AuthorQuota, BacklogLimits,
};
use crate::ledger::DedupLedger;

pub const DEFAULT_FETCH_LIMIT: usize = 100;
pub const DEFAULT_HOURS_BACK: i64 = 2;
pub const DEFAULT_MAX_PER_AUTHOR: usize = 3;
pub const DEFAULT_MAX_PER_RUN: usize = 100;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// Everything a repost run needs to know besides its collaborators.
#[derive(Debug, Clone)]
pub struct RepostSettings {
    pub source: SourceSpec,
    pub fetch_limit: usize,
    pub rules: FilterRules,
    pub limits: BacklogLimits,
    pub delay: Duration,
    pub dry_run: bool,
}

impl RepostSettings {
    /// Settings with the default window, caps and delay.
    pub fn new(source: SourceSpec) -> Self {
        Self {
            source,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            rules: FilterRules::windowed(DEFAULT_HOURS_BACK),
            limits: BacklogLimits {
                max_per_author: DEFAULT_MAX_PER_AUTHOR,
                max_per_run: DEFAULT_MAX_PER_RUN,
            },
            delay: DEFAULT_DELAY,
            dry_run: false,
        }
    }
}

/// Run the bounded repost pipeline.
///
/// `repo` is the acting account's DID and `now` the reference time for the
/// window. Returns an error only when the fetch or the final ledger flush
/// fails.
pub async fn run<S, R, L>(
    source: &S,
    remote: &R,
    repo: &str,
    ledger: &mut L,
    settings: &RepostSettings,
    now: DateTime<Utc>,
) -> Result<RunSummary>
where
    S: FeedSource + ?Sized,
    R: RemoteActions + ?Sized,
    L: DedupLedger + ?Sized,
{
    let entries = fetch_entries(source, &settings.source, settings.fetch_limit).await?;

    let filtered = filter_entries(&entries, &settings.rules, now);
    let accepted = filtered.accepted.len();
    let fresh = exclude_seen(filtered.accepted, |uri| ledger.contains(uri));
    let fresh_count = fresh.len();

    info!(
        fetched = entries.len(),
        accepted,
        fresh = fresh_count,
        "Filtered feed"
    );

    let mut summary = RunSummary {
        fetched: entries.len(),
        accepted,
        fresh: fresh_count,
        rejections: filtered.rejections,
        dry_run: settings.dry_run,
        ..RunSummary::default()
    };

    if settings.dry_run {
        summary.selected = select_backlog(fresh, settings.limits);
        info!(selected = summary.selected.len(), "Planned reposts");
        return Ok(summary);
    }

    let mut pacer = Pacer::new(settings.delay);
    let mut quota = AuthorQuota::new(settings.limits.max_per_author);
    let mut attempted = Vec::new();

    for post in order_backlog(fresh) {
        if summary.reposted >= settings.limits.max_per_run {
            break;
        }
        if !quota.has_room(&post.author_key) {
            summary.skipped += 1;
            continue;
        }

        pacer.next_turn().await;
        let promotion = promote(remote, repo, &post).await;

        if promotion.reposted() {
            summary.reposted += 1;
            quota.consume(&post.author_key);
            if let Err(e) = ledger.record(post.uri()) {
                warn!(uri = %post.uri(), error = %e, "Ledger append failed, will retry at flush");
            }
            info!(
                author = %post.author_handle,
                uri = %post.uri(),
                n = summary.reposted,
                max = settings.limits.max_per_run,
                "Reposted"
            );
        } else {
            summary.failed += 1;
        }
        if promotion.liked() {
            summary.liked += 1;
        }

        attempted.push(post);
    }

    ledger.flush().context("Failed to persist repost ledger")?;

    summary.selected = attempted;
    Ok(summary)
}
