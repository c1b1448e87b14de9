// Action executor — performs the promotional writes for one candidate.
//
// Nothing in here returns early on a remote failure. Each step's outcome is
// captured in the returned value and the caller decides what counts.

use anyhow::Result;
use atrium_api::types::string::Datetime;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bluesky::actions::{rkey_from_uri, ActionKind, RemoteActions};
use crate::curation::models::{PostRecord, PriorActions};
use crate::curation::select::LatestPick;

/// Outcome of reposting and then liking one post.
#[derive(Debug)]
pub struct Promotion {
    /// AT-URI of the new repost record, or why it failed.
    pub repost: Result<String>,
    /// `None` when the repost failed and the like was not attempted.
    pub like: Option<Result<String>>,
}

impl Promotion {
    pub fn reposted(&self) -> bool {
        self.repost.is_ok()
    }

    pub fn liked(&self) -> bool {
        matches!(self.like, Some(Ok(_)))
    }
}

/// Repost `post`, then like it if the repost went through.
pub async fn promote<R: RemoteActions + ?Sized>(
    remote: &R,
    repo: &str,
    post: &PostRecord,
) -> Promotion {
    let repost = remote
        .create(ActionKind::Repost, repo, &post.id, &Datetime::now())
        .await;

    if let Err(e) = &repost {
        warn!(uri = %post.id.uri, author = %post.author_handle, error = %e, "Repost failed");
        return Promotion { repost, like: None };
    }

    let like = remote
        .create(ActionKind::Like, repo, &post.id, &Datetime::now())
        .await;
    if let Err(e) = &like {
        warn!(uri = %post.id.uri, author = %post.author_handle, error = %e, "Like failed");
    }

    Promotion {
        repost,
        like: Some(like),
    }
}

/// What happened to one existing repost/like record we tried to remove.
#[derive(Debug)]
pub enum ReversalOutcome {
    Deleted,
    /// The record URI had no usable record key; nothing was sent.
    Malformed,
    Failed(anyhow::Error),
}

#[derive(Debug)]
pub struct Reversal {
    pub kind: ActionKind,
    /// The post the record pointed at.
    pub post_uri: String,
    /// The repost/like record itself.
    pub record_uri: String,
    pub outcome: ReversalOutcome,
}

impl Reversal {
    pub fn deleted(&self) -> bool {
        matches!(self.outcome, ReversalOutcome::Deleted)
    }
}

/// Delete this account's existing repost and like on a post, repost first.
///
/// Malformed record URIs and failed deletes are logged and reported, never
/// raised.
pub async fn reverse_prior<R: RemoteActions + ?Sized>(
    remote: &R,
    repo: &str,
    post_uri: &str,
    prior: &PriorActions,
) -> Vec<Reversal> {
    let mut reversals = Vec::new();

    for (kind, record_uri) in [
        (ActionKind::Repost, prior.repost.as_deref()),
        (ActionKind::Like, prior.like.as_deref()),
    ] {
        let Some(record_uri) = record_uri else {
            continue;
        };

        let outcome = match rkey_from_uri(record_uri) {
            None => {
                warn!(record = record_uri, "Cannot parse record key from {kind} uri");
                ReversalOutcome::Malformed
            }
            Some(rkey) => match remote.delete(kind, repo, rkey).await {
                Ok(()) => {
                    debug!(post = post_uri, record = record_uri, "Removed old {kind}");
                    ReversalOutcome::Deleted
                }
                Err(e) => {
                    warn!(record = record_uri, error = %e, "Failed to delete {kind}");
                    ReversalOutcome::Failed(e)
                }
            },
        };

        reversals.push(Reversal {
            kind,
            post_uri: post_uri.to_string(),
            record_uri: record_uri.to_string(),
            outcome,
        });
    }

    reversals
}

/// Outcome of the replace-and-promote sequence for one author.
#[derive(Debug)]
pub struct Replacement {
    pub reversals: Vec<Reversal>,
    pub promotion: Promotion,
}

/// Clear this account's earlier promotions of the author, clear any existing
/// repost/like on the chosen post, then repost and like it fresh.
pub async fn replace_and_promote<R: RemoteActions + ?Sized>(
    remote: &R,
    repo: &str,
    pick: &LatestPick,
) -> Replacement {
    let mut reversals = Vec::new();

    for old in &pick.superseded {
        reversals.extend(reverse_prior(remote, repo, &old.uri, &old.actions).await);
    }
    reversals.extend(reverse_prior(remote, repo, &pick.post.id.uri, &pick.post.viewer).await);

    let promotion = promote(remote, repo, &pick.post).await;
    if promotion.reposted() {
        info!(author = %pick.post.author_handle, uri = %pick.post.id.uri, "Reposted newest media");
    }

    Replacement {
        reversals,
        promotion,
    }
}

/// Fixed client-side delay between write attempts.
///
/// Waits before every attempt except the first, so nothing is slept after
/// the last one. A failed attempt still counts as a turn.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    /// Call right before each attempt.
    pub async fn next_turn(&mut self) {
        let first = !std::mem::replace(&mut self.started, true);
        if !first && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn pacer_does_not_wait_before_the_first_attempt() {
        let mut pacer = Pacer::new(Duration::from_millis(200));
        let start = Instant::now();
        pacer.next_turn().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn pacer_waits_between_attempts() {
        let mut pacer = Pacer::new(Duration::from_millis(50));
        pacer.next_turn().await;
        let start = Instant::now();
        pacer.next_turn().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(45),
            "Expected at least ~50ms delay, got {:?}",
            elapsed
        );
    }
}
