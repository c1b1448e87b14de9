// Shared fakes for the pipeline tests: an in-memory Bluesky that serves
// canned feed entries and records every write it receives.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use atrium_api::types::string::Datetime;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use skycurate::bluesky::actions::RemoteActions;
use skycurate::bluesky::feed::{AuthorRef, FeedSource};
use skycurate::curation::models::{ContentRef, EmbedShape, FeedEntry, PriorActions};

pub const ME: &str = "did:plc:curator";

/// Reference time used by every test: 2025-03-01 12:00 UTC.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// `minutes` before `now()`, as an RFC 3339 string.
pub fn ago(minutes: i64) -> String {
    (now() - chrono::Duration::minutes(minutes))
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn post_uri(author: &str, n: u32) -> String {
    format!("at://{author}/app.bsky.feed.post/{n}")
}

/// A plain original post by `author`, created `minutes_ago` before `now()`.
pub fn entry(author: &str, n: u32, minutes_ago: i64) -> FeedEntry {
    FeedEntry {
        uri: post_uri(author, n),
        cid: format!("bafy{author}{n}"),
        author_did: author.to_string(),
        author_handle: format!("{}.test", author.trim_start_matches("did:plc:")),
        record_created_at: Some(ago(minutes_ago)),
        ..Default::default()
    }
}

/// Same as `entry` but with one image attached.
pub fn media_entry(author: &str, n: u32, minutes_ago: i64) -> FeedEntry {
    FeedEntry {
        embed: Some(EmbedShape::Images { count: 1 }),
        ..entry(author, n, minutes_ago)
    }
}

pub fn with_viewer(mut e: FeedEntry, repost: Option<&str>, like: Option<&str>) -> FeedEntry {
    e.viewer = PriorActions {
        repost: repost.map(String::from),
        like: like.map(String::from),
    };
    e
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateRepost(String),
    CreateLike(String),
    DeleteRepost(String),
    DeleteLike(String),
}

#[derive(Default)]
pub struct FakeBluesky {
    pub feed: Vec<FeedEntry>,
    pub members: Vec<AuthorRef>,
    pub author_feeds: HashMap<String, Vec<FeedEntry>>,
    pub fail_fetch: bool,
    pub fail_repost_for: HashSet<String>,
    pub fail_like_for: HashSet<String>,
    pub fail_delete: bool,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeBluesky {
    pub fn with_feed(feed: Vec<FeedEntry>) -> Self {
        Self {
            feed,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reposted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateRepost(uri) => Some(uri),
                _ => None,
            })
            .collect()
    }

    pub fn liked(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateLike(uri) => Some(uri),
                _ => None,
            })
            .collect()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_fetch(&self) -> Result<()> {
        if self.fail_fetch {
            anyhow::bail!("XRPC app.bsky.feed.getFeed returned 502 Bad Gateway");
        }
        Ok(())
    }
}

#[async_trait]
impl FeedSource for FakeBluesky {
    async fn fetch_generator_feed(&self, _feed_uri: &str, limit: usize) -> Result<Vec<FeedEntry>> {
        self.check_fetch()?;
        Ok(self.feed.iter().take(limit).cloned().collect())
    }

    async fn fetch_list_members(&self, _list_uri: &str) -> Result<Vec<AuthorRef>> {
        self.check_fetch()?;
        Ok(self.members.clone())
    }

    async fn fetch_author_feed(&self, author: &AuthorRef, limit: usize) -> Result<Vec<FeedEntry>> {
        self.check_fetch()?;
        Ok(self
            .author_feeds
            .get(&author.did)
            .map(|feed| feed.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_list_feed(&self, _list_uri: &str, limit: usize) -> Result<Vec<FeedEntry>> {
        self.check_fetch()?;
        Ok(self.feed.iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl RemoteActions for FakeBluesky {
    async fn create_repost(
        &self,
        repo: &str,
        subject: &ContentRef,
        _created_at: &Datetime,
    ) -> Result<String> {
        assert_eq!(repo, ME);
        if self.fail_repost_for.contains(&subject.uri) {
            anyhow::bail!("XRPC com.atproto.repo.createRecord returned 500");
        }
        self.log(Call::CreateRepost(subject.uri.clone()));
        Ok(format!("at://{ME}/app.bsky.feed.repost/r{}", self.calls().len()))
    }

    async fn create_like(
        &self,
        repo: &str,
        subject: &ContentRef,
        _created_at: &Datetime,
    ) -> Result<String> {
        assert_eq!(repo, ME);
        if self.fail_like_for.contains(&subject.uri) {
            anyhow::bail!("XRPC com.atproto.repo.createRecord returned 500");
        }
        self.log(Call::CreateLike(subject.uri.clone()));
        Ok(format!("at://{ME}/app.bsky.feed.like/l{}", self.calls().len()))
    }

    async fn delete_repost(&self, _repo: &str, rkey: &str) -> Result<()> {
        if self.fail_delete {
            anyhow::bail!("XRPC com.atproto.repo.deleteRecord returned 500");
        }
        self.log(Call::DeleteRepost(rkey.to_string()));
        Ok(())
    }

    async fn delete_like(&self, _repo: &str, rkey: &str) -> Result<()> {
        if self.fail_delete {
            anyhow::bail!("XRPC com.atproto.repo.deleteRecord returned 500");
        }
        self.log(Call::DeleteLike(rkey.to_string()));
        Ok(())
    }
}
