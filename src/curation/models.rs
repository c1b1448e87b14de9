// Normalized records shared by the filter, the selection policies and the
// executor.
//
// `FeedEntry` is what the feed adapter hands over: one feed item flattened
// into plain fields, with nothing decided yet. `PostRecord` is what survives
// the candidate filter.

use chrono::{DateTime, Utc};

/// Content address of a post: the AT-URI plus the CID of the exact version.
///
/// Both halves are needed to create a repost or like. The URI alone is the
/// deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentRef {
    pub uri: String,
    pub cid: String,
}

/// The viewer's own existing actions on a post, as reported by the
/// per-post viewer state. Values are the AT-URIs of the repost/like records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorActions {
    pub repost: Option<String>,
    pub like: Option<String>,
}

impl PriorActions {
    pub fn is_empty(&self) -> bool {
        self.repost.is_none() && self.like.is_none()
    }
}

/// Shape of a post's embed, reduced to what the media and quote checks need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedShape {
    Images { count: usize },
    Video,
    /// Link card
    External,
    /// Quote of another post
    Record,
    /// Quote of another post with attached media
    RecordWithMedia { media: Box<EmbedShape> },
    Other,
}

impl EmbedShape {
    /// True when the embed carries at least one image or a video, looking
    /// through the media half of a record-with-media composite.
    pub fn has_visual_media(&self) -> bool {
        match self {
            EmbedShape::Images { count } => *count > 0,
            EmbedShape::Video => true,
            EmbedShape::RecordWithMedia { media } => media.has_visual_media(),
            EmbedShape::External | EmbedShape::Record | EmbedShape::Other => false,
        }
    }

    pub fn is_quote(&self) -> bool {
        matches!(
            self,
            EmbedShape::Record | EmbedShape::RecordWithMedia { .. }
        )
    }
}

/// One raw feed item, flattened.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub uri: String,
    pub cid: String,
    pub author_did: String,
    pub author_handle: String,
    /// `$type` of the feed reason, present when the item was surfaced by
    /// someone else's repost (or a pin) rather than plain authorship.
    pub reason: Option<String>,
    /// The post body references a reply parent.
    pub reply_parent: bool,
    pub embed: Option<EmbedShape>,
    /// `createdAt` on the post record body.
    pub record_created_at: Option<String>,
    /// `createdAt` on the post view wrapper, when a server includes one.
    pub post_created_at: Option<String>,
    pub indexed_at: Option<String>,
    /// Generic timestamp some feed generators attach to the item.
    pub timestamp: Option<String>,
    pub viewer: PriorActions,
}

/// Structural booleans derived from a feed entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostShape {
    pub is_reply: bool,
    pub is_repost: bool,
    pub is_quote: bool,
    pub has_media: bool,
}

impl PostShape {
    pub fn of(entry: &FeedEntry) -> Self {
        let embed = entry.embed.as_ref();
        Self {
            is_reply: entry.reply_parent,
            is_repost: entry.reason.is_some(),
            is_quote: embed.is_some_and(EmbedShape::is_quote),
            has_media: embed.is_some_and(EmbedShape::has_visual_media),
        }
    }
}

/// A feed entry that passed the candidate filter.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: ContentRef,
    /// Author DID. Handles can change hands, so quotas never key off them.
    pub author_key: String,
    /// Kept for log lines only.
    pub author_handle: String,
    pub created_at: DateTime<Utc>,
    pub shape: PostShape,
    pub viewer: PriorActions,
}

impl PostRecord {
    pub fn uri(&self) -> &str {
        &self.id.uri
    }
}
