// Feed fetching — generator feeds, list feeds and list-member author feeds.
//
// Every fetch is a single bounded page; there is no pagination. Pages decode
// into the atrium lexicon outputs and each `FeedViewPost` is flattened into a
// `FeedEntry`. A page that doesn't decode fails the fetch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use atrium_api::app::bsky::embed::record_with_media::{MainMediaRefs, ViewMediaRefs};
use atrium_api::app::bsky::feed::defs::{FeedViewPost, FeedViewPostReasonRefs, PostViewEmbedRefs};
use atrium_api::app::bsky::feed::post::{self, RecordEmbedRefs};
use atrium_api::app::bsky::feed::{get_author_feed, get_feed, get_list_feed};
use atrium_api::app::bsky::graph::get_list;
use atrium_api::types::Union;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::client::AtpClient;
use crate::curation::models::{EmbedShape, FeedEntry, PriorActions};

/// API maximum for a single feed page.
pub const MAX_PAGE_SIZE: usize = 100;

/// A list member whose author feed can be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRef {
    pub did: String,
    pub handle: String,
}

/// Where candidate posts come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A feed generator (`app.bsky.feed.generator` URI).
    Generator(String),
    /// Every member of a curated list, each via their own author feed.
    ListMembers(String),
    /// The list-backed timeline of a list.
    ListFeed(String),
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Generator(uri) => write!(f, "feed {uri}"),
            SourceSpec::ListMembers(uri) => write!(f, "members of list {uri}"),
            SourceSpec::ListFeed(uri) => write!(f, "list feed {uri}"),
        }
    }
}

/// Read side of the remote service.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_generator_feed(&self, feed_uri: &str, limit: usize) -> Result<Vec<FeedEntry>>;

    async fn fetch_list_members(&self, list_uri: &str) -> Result<Vec<AuthorRef>>;

    async fn fetch_author_feed(&self, author: &AuthorRef, limit: usize) -> Result<Vec<FeedEntry>>;

    async fn fetch_list_feed(&self, list_uri: &str, limit: usize) -> Result<Vec<FeedEntry>>;
}

/// Clamp a requested page size into the range the API accepts.
pub fn page_size(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// Fetch raw entries for a source. Any failed fetch fails the whole call.
pub async fn fetch_entries<S: FeedSource + ?Sized>(
    source: &S,
    spec: &SourceSpec,
    limit: usize,
) -> Result<Vec<FeedEntry>> {
    let entries = match spec {
        SourceSpec::Generator(uri) => source.fetch_generator_feed(uri, limit).await?,
        SourceSpec::ListFeed(uri) => source.fetch_list_feed(uri, limit).await?,
        SourceSpec::ListMembers(uri) => {
            let members = source.fetch_list_members(uri).await?;
            info!(members = members.len(), "Fetched list members");

            let mut entries = Vec::new();
            for member in &members {
                let feed = source.fetch_author_feed(member, limit).await?;
                debug!(author = %member.handle, posts = feed.len(), "Fetched author feed");
                entries.extend(feed);
            }
            entries
        }
    };

    info!(count = entries.len(), source = %spec, "Fetched feed entries");
    Ok(entries)
}

#[async_trait]
impl FeedSource for AtpClient {
    async fn fetch_generator_feed(&self, feed_uri: &str, limit: usize) -> Result<Vec<FeedEntry>> {
        let limit = page_size(limit).to_string();
        let output: get_feed::Output = self
            .xrpc_get(get_feed::NSID, &[("feed", feed_uri), ("limit", &limit)])
            .await
            .with_context(|| format!("Failed to fetch feed {feed_uri}"))?;
        Ok(into_entries(output.data.feed))
    }

    async fn fetch_list_members(&self, list_uri: &str) -> Result<Vec<AuthorRef>> {
        let limit = MAX_PAGE_SIZE.to_string();
        let output: get_list::Output = self
            .xrpc_get(get_list::NSID, &[("list", list_uri), ("limit", &limit)])
            .await
            .with_context(|| format!("Failed to fetch members of list {list_uri}"))?;

        Ok(output
            .data
            .items
            .into_iter()
            .map(|item| {
                let subject = item.data.subject.data;
                AuthorRef {
                    did: subject.did.into(),
                    handle: subject.handle.into(),
                }
            })
            .collect())
    }

    async fn fetch_author_feed(&self, author: &AuthorRef, limit: usize) -> Result<Vec<FeedEntry>> {
        let limit = page_size(limit).to_string();
        let output: get_author_feed::Output = self
            .xrpc_get(
                get_author_feed::NSID,
                &[
                    ("actor", author.did.as_str()),
                    ("filter", "posts_no_replies"),
                    ("limit", &limit),
                ],
            )
            .await
            .with_context(|| format!("Failed to fetch feed for @{}", author.handle))?;
        Ok(into_entries(output.data.feed))
    }

    async fn fetch_list_feed(&self, list_uri: &str, limit: usize) -> Result<Vec<FeedEntry>> {
        let limit = page_size(limit).to_string();
        let output: get_list_feed::Output = self
            .xrpc_get(get_list_feed::NSID, &[("list", list_uri), ("limit", &limit)])
            .await
            .with_context(|| format!("Failed to fetch list feed {list_uri}"))?;
        Ok(into_entries(output.data.feed))
    }
}

/// Flatten a decoded feed page into entries, keeping page order.
pub fn into_entries(feed: Vec<FeedViewPost>) -> Vec<FeedEntry> {
    feed.into_iter().map(FeedEntry::from).collect()
}

/// Timestamps some AppViews attach outside the lexicon: `createdAt` on the
/// post view and `timestamp` on the feed item.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtraTimes {
    created_at: Option<String>,
    timestamp: Option<String>,
}

/// Re-read a value as another serde type, `None` when it doesn't fit.
///
/// atrium's `TryFromUnknown` unwraps on a shape mismatch, so records go
/// through this instead.
fn retype<T: DeserializeOwned>(value: &impl Serialize) -> Option<T> {
    let bytes = serde_json::to_vec(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}

impl From<FeedViewPost> for FeedEntry {
    fn from(item: FeedViewPost) -> Self {
        let item_times: ExtraTimes = retype(&item.extra_data).unwrap_or_default();
        let item = item.data;
        let post_times: ExtraTimes = retype(&item.post.extra_data).unwrap_or_default();
        let view = item.post.data;
        let record: Option<post::Record> = retype(&view.record);

        let embed = match &record {
            Some(record) => record.embed.as_ref().map(record_embed_shape),
            None => view.embed.as_ref().map(view_embed_shape),
        };
        let reply_parent =
            item.reply.is_some() || record.as_ref().is_some_and(|r| r.reply.is_some());
        let viewer = view
            .viewer
            .map(|v| PriorActions {
                repost: v.data.repost,
                like: v.data.like,
            })
            .unwrap_or_default();

        FeedEntry {
            uri: view.uri,
            cid: view.cid.as_ref().to_string(),
            author_did: view.author.data.did.into(),
            author_handle: view.author.data.handle.into(),
            reason: item.reason.as_ref().map(reason_type),
            reply_parent,
            embed,
            record_created_at: record.as_ref().map(|r| r.created_at.as_str().to_string()),
            post_created_at: post_times.created_at,
            indexed_at: Some(view.indexed_at.as_str().to_string()),
            timestamp: item_times.timestamp,
            viewer,
        }
    }
}

fn reason_type(reason: &Union<FeedViewPostReasonRefs>) -> String {
    match reason {
        Union::Refs(FeedViewPostReasonRefs::ReasonRepost(_)) => {
            "app.bsky.feed.defs#reasonRepost".to_string()
        }
        Union::Refs(FeedViewPostReasonRefs::ReasonPin(_)) => {
            "app.bsky.feed.defs#reasonPin".to_string()
        }
        Union::Unknown(other) => other.r#type.clone(),
    }
}

/// Classify the embed of a post record.
pub fn record_embed_shape(embed: &Union<RecordEmbedRefs>) -> EmbedShape {
    let Union::Refs(embed) = embed else {
        return EmbedShape::Other;
    };
    match embed {
        RecordEmbedRefs::AppBskyEmbedImagesMain(images) => EmbedShape::Images {
            count: images.images.len(),
        },
        RecordEmbedRefs::AppBskyEmbedVideoMain(_) => EmbedShape::Video,
        RecordEmbedRefs::AppBskyEmbedExternalMain(_) => EmbedShape::External,
        RecordEmbedRefs::AppBskyEmbedRecordMain(_) => EmbedShape::Record,
        RecordEmbedRefs::AppBskyEmbedRecordWithMediaMain(quote) => {
            let media = match &quote.media {
                Union::Refs(MainMediaRefs::AppBskyEmbedImagesMain(images)) => EmbedShape::Images {
                    count: images.images.len(),
                },
                Union::Refs(MainMediaRefs::AppBskyEmbedVideoMain(_)) => EmbedShape::Video,
                Union::Refs(MainMediaRefs::AppBskyEmbedExternalMain(_)) => EmbedShape::External,
                Union::Unknown(_) => EmbedShape::Other,
            };
            EmbedShape::RecordWithMedia {
                media: Box::new(media),
            }
        }
    }
}

/// Classify the hydrated embed view of a post. Used when the record itself
/// doesn't decode.
pub fn view_embed_shape(embed: &Union<PostViewEmbedRefs>) -> EmbedShape {
    let Union::Refs(embed) = embed else {
        return EmbedShape::Other;
    };
    match embed {
        PostViewEmbedRefs::AppBskyEmbedImagesView(images) => EmbedShape::Images {
            count: images.images.len(),
        },
        PostViewEmbedRefs::AppBskyEmbedVideoView(_) => EmbedShape::Video,
        PostViewEmbedRefs::AppBskyEmbedExternalView(_) => EmbedShape::External,
        PostViewEmbedRefs::AppBskyEmbedRecordView(_) => EmbedShape::Record,
        PostViewEmbedRefs::AppBskyEmbedRecordWithMediaView(quote) => {
            let media = match &quote.media {
                Union::Refs(ViewMediaRefs::AppBskyEmbedImagesView(images)) => EmbedShape::Images {
                    count: images.images.len(),
                },
                Union::Refs(ViewMediaRefs::AppBskyEmbedVideoView(_)) => EmbedShape::Video,
                Union::Refs(ViewMediaRefs::AppBskyEmbedExternalView(_)) => EmbedShape::External,
                Union::Unknown(_) => EmbedShape::Other,
            };
            EmbedShape::RecordWithMedia {
                media: Box::new(media),
            }
        }
    }
}
