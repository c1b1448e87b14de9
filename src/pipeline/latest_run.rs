// Latest-per-author run — keeps exactly one promoted post per author.
//
// For each author in the source (newest-first order), the newest original
// photo/video post is picked. Any repost/like this account still has on that
// author's older posts, or on the picked post itself, is removed before the
// picked post is reposted and liked again. Re-running is safe without a
// ledger: the end state is always "one promotion, pointing at the newest".

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::info;

use super::executor::{replace_and_promote, Pacer};
use super::RunSummary;
use crate::bluesky::actions::RemoteActions;
use crate::bluesky::feed::{fetch_entries, FeedSource, SourceSpec};
use crate::curation::filter::{filter_entries, FilterRules};
use crate::curation::select::{attach_superseded, select_latest_per_author};

pub const DEFAULT_FETCH_LIMIT: usize = 100;
pub const DEFAULT_MAX_AUTHORS: usize = 50;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct LatestSettings {
    pub source: SourceSpec,
    pub fetch_limit: usize,
    pub max_authors: usize,
    pub delay: Duration,
    pub dry_run: bool,
}

impl LatestSettings {
    pub fn new(source: SourceSpec) -> Self {
        Self {
            source,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            max_authors: DEFAULT_MAX_AUTHORS,
            delay: DEFAULT_DELAY,
            dry_run: false,
        }
    }
}

/// Run the replace-and-promote pipeline.
pub async fn run<S, R>(
    source: &S,
    remote: &R,
    repo: &str,
    settings: &LatestSettings,
    now: DateTime<Utc>,
) -> Result<RunSummary>
where
    S: FeedSource + ?Sized,
    R: RemoteActions + ?Sized,
{
    let entries = fetch_entries(source, &settings.source, settings.fetch_limit).await?;

    let filtered = filter_entries(&entries, &FilterRules::original_media(), now);
    let accepted = filtered.accepted.len();
    let picks = attach_superseded(
        select_latest_per_author(filtered.accepted, settings.max_authors),
        &entries,
    );

    info!(
        fetched = entries.len(),
        accepted,
        authors = picks.len(),
        "Selected newest photo/video per account"
    );

    let mut summary = RunSummary {
        fetched: entries.len(),
        accepted,
        fresh: accepted,
        rejections: filtered.rejections,
        dry_run: settings.dry_run,
        ..RunSummary::default()
    };

    if settings.dry_run || picks.is_empty() {
        summary.selected = picks.into_iter().map(|p| p.post).collect();
        return Ok(summary);
    }

    let mut pacer = Pacer::new(settings.delay);

    for pick in &picks {
        pacer.next_turn().await;
        let replacement = replace_and_promote(remote, repo, pick).await;

        for reversal in &replacement.reversals {
            if reversal.deleted() {
                summary.reversed += 1;
            } else {
                summary.reversal_failures += 1;
            }
        }

        if replacement.promotion.reposted() {
            summary.reposted += 1;
        } else {
            summary.failed += 1;
        }
        if replacement.promotion.liked() {
            summary.liked += 1;
        }
    }

    summary.selected = picks.into_iter().map(|p| p.post).collect();
    Ok(summary)
}
