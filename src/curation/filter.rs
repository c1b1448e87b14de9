// Candidate filter — turns raw feed entries into PostRecords or rejections.
//
// Checks run in a fixed order and stop at the first rejection. Ordering of
// the accepted records is left to the selection policies.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

use super::models::{ContentRef, FeedEntry, PostRecord, PostShape};

/// Which checks a flow wants applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRules {
    /// Reject quote-posts.
    pub original_only: bool,
    /// Require at least one image or a video.
    pub media_only: bool,
    /// Reject anything created more than this many hours before `now`.
    pub window_hours: Option<i64>,
}

impl FilterRules {
    /// Rules for the bounded repost run: time-windowed, any content shape.
    pub fn windowed(hours_back: i64) -> Self {
        Self {
            original_only: false,
            media_only: false,
            window_hours: Some(hours_back),
        }
    }

    /// Rules for the latest-per-author run: original media posts, no window.
    pub fn original_media() -> Self {
        Self {
            original_only: true,
            media_only: true,
            window_hours: None,
        }
    }
}

/// Why an entry was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rejection {
    SurfacedByRepost,
    Reply,
    Quote,
    NoMedia,
    MissingTimestamp,
    OutsideWindow,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rejection::SurfacedByRepost => "surfaced by repost",
            Rejection::Reply => "reply",
            Rejection::Quote => "quote",
            Rejection::NoMedia => "no media",
            Rejection::MissingTimestamp => "missing timestamp",
            Rejection::OutsideWindow => "outside window",
        };
        f.write_str(label)
    }
}

type TimestampAccessor = fn(&FeedEntry) -> Option<&str>;

fn record_created_at(e: &FeedEntry) -> Option<&str> {
    e.record_created_at.as_deref()
}

fn post_created_at(e: &FeedEntry) -> Option<&str> {
    e.post_created_at.as_deref()
}

fn indexed_at(e: &FeedEntry) -> Option<&str> {
    e.indexed_at.as_deref()
}

fn generic_timestamp(e: &FeedEntry) -> Option<&str> {
    e.timestamp.as_deref()
}

/// Timestamp sources in priority order.
const TIMESTAMP_SOURCES: [(&str, TimestampAccessor); 4] = [
    ("record.createdAt", record_created_at),
    ("post.createdAt", post_created_at),
    ("post.indexedAt", indexed_at),
    ("timestamp", generic_timestamp),
];

/// Parse an ISO-8601 instant. Values without an offset are taken as UTC.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Resolve an entry's creation time from the first source that parses.
pub fn resolve_created_at(entry: &FeedEntry) -> Option<DateTime<Utc>> {
    TIMESTAMP_SOURCES.iter().find_map(|&(source, get)| {
        let raw = get(entry)?;
        let parsed = parse_instant(raw);
        if parsed.is_none() {
            tracing::debug!(uri = %entry.uri, source, value = raw, "Unparseable timestamp");
        }
        parsed
    })
}

/// Start of a window of `hours` ending at `now`. `None` when it reaches past
/// what chrono can represent, in which case nothing is too old.
fn window_start(now: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(Duration::try_hours(hours)?)
}

/// Classify one entry against `rules` at reference time `now`.
pub fn classify(
    entry: &FeedEntry,
    rules: &FilterRules,
    now: DateTime<Utc>,
) -> Result<PostRecord, Rejection> {
    let shape = PostShape::of(entry);

    if shape.is_repost {
        return Err(Rejection::SurfacedByRepost);
    }
    if shape.is_reply {
        return Err(Rejection::Reply);
    }
    if rules.original_only && shape.is_quote {
        return Err(Rejection::Quote);
    }
    if rules.media_only && !shape.has_media {
        return Err(Rejection::NoMedia);
    }

    let created_at = resolve_created_at(entry).ok_or(Rejection::MissingTimestamp)?;

    if let Some(start) = rules.window_hours.and_then(|hours| window_start(now, hours)) {
        if created_at < start {
            return Err(Rejection::OutsideWindow);
        }
    }

    Ok(PostRecord {
        id: ContentRef {
            uri: entry.uri.clone(),
            cid: entry.cid.clone(),
        },
        author_key: entry.author_did.clone(),
        author_handle: entry.author_handle.clone(),
        created_at,
        shape,
        viewer: entry.viewer.clone(),
    })
}

/// Result of filtering a whole batch: accepted records in feed order plus a
/// tally of rejections.
#[derive(Debug, Default)]
pub struct Filtered {
    pub accepted: Vec<PostRecord>,
    pub rejections: BTreeMap<Rejection, usize>,
}

impl Filtered {
    pub fn rejected(&self) -> usize {
        self.rejections.values().sum()
    }
}

/// Filter a batch, preserving feed order among accepted records.
pub fn filter_entries(entries: &[FeedEntry], rules: &FilterRules, now: DateTime<Utc>) -> Filtered {
    let mut out = Filtered::default();
    for entry in entries {
        match classify(entry, rules, now) {
            Ok(record) => out.accepted.push(record),
            Err(reason) => {
                tracing::debug!(uri = %entry.uri, reason = %reason, "Rejected entry");
                *out.rejections.entry(reason).or_insert(0) += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curation::models::EmbedShape;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn entry(created: &str) -> FeedEntry {
        FeedEntry {
            uri: "at://did:plc:a/app.bsky.feed.post/1".to_string(),
            cid: "bafy1".to_string(),
            author_did: "did:plc:a".to_string(),
            author_handle: "a.bsky.social".to_string(),
            record_created_at: Some(created.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn huge_window_admits_everything_instead_of_overflowing() {
        let ancient = entry("1970-01-01T00:00:00Z");
        for hours in [3_000_000_000, i64::MAX] {
            let record = classify(&ancient, &FilterRules::windowed(hours), now()).unwrap();
            assert_eq!(record.created_at.timestamp(), 0);
        }
    }

    #[test]
    fn window_edge_is_inclusive() {
        assert!(classify(&entry("2025-03-01T10:00:00Z"), &FilterRules::windowed(2), now()).is_ok());
        assert_eq!(
            classify(&entry("2025-03-01T09:59:59Z"), &FilterRules::windowed(2), now()).unwrap_err(),
            Rejection::OutsideWindow
        );
    }

    #[test]
    fn parses_zulu_and_offset_and_naive() {
        let z = parse_instant("2025-03-01T10:00:00.000Z").unwrap();
        let off = parse_instant("2025-03-01T11:00:00+01:00").unwrap();
        let naive = parse_instant("2025-03-01T10:00:00").unwrap();
        assert_eq!(z, off);
        assert_eq!(z, naive);
        assert!(parse_instant("yesterday").is_none());
    }

    #[test]
    fn timestamp_falls_through_to_next_source() {
        let mut e = entry("not a date");
        e.indexed_at = Some("2025-03-01T11:30:00Z".to_string());
        let resolved = resolve_created_at(&e).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2025, 3, 1, 11, 30, 0).unwrap());
    }

    #[test]
    fn record_timestamp_wins_over_indexed() {
        let mut e = entry("2025-03-01T11:00:00Z");
        e.indexed_at = Some("2025-03-01T11:30:00Z".to_string());
        assert_eq!(
            resolve_created_at(&e).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_timestamp_is_rejected() {
        let mut e = entry("garbage");
        e.record_created_at = None;
        assert_eq!(
            classify(&e, &FilterRules::default(), now()),
            Err(Rejection::MissingTimestamp)
        );
    }

    #[test]
    fn reason_rejects_before_anything_else() {
        let mut e = entry("2025-03-01T11:59:00Z");
        e.reason = Some("app.bsky.feed.defs#reasonRepost".to_string());
        e.reply_parent = true;
        assert_eq!(
            classify(&e, &FilterRules::windowed(2), now()),
            Err(Rejection::SurfacedByRepost)
        );
    }

    #[test]
    fn replies_are_rejected() {
        let mut e = entry("2025-03-01T11:59:00Z");
        e.reply_parent = true;
        assert_eq!(
            classify(&e, &FilterRules::default(), now()),
            Err(Rejection::Reply)
        );
    }

    #[test]
    fn quotes_rejected_only_when_original_only() {
        let mut e = entry("2025-03-01T11:59:00Z");
        e.embed = Some(EmbedShape::Record);
        assert!(classify(&e, &FilterRules::windowed(2), now()).is_ok());
        assert_eq!(
            classify(&e, &FilterRules::original_media(), now()),
            Err(Rejection::Quote)
        );
    }

    #[test]
    fn link_card_is_not_media() {
        let mut e = entry("2025-03-01T11:59:00Z");
        e.embed = Some(EmbedShape::External);
        assert_eq!(
            classify(&e, &FilterRules::original_media(), now()),
            Err(Rejection::NoMedia)
        );
    }

    #[test]
    fn empty_image_list_is_not_media() {
        let mut e = entry("2025-03-01T11:59:00Z");
        e.embed = Some(EmbedShape::Images { count: 0 });
        assert_eq!(
            classify(&e, &FilterRules::original_media(), now()),
            Err(Rejection::NoMedia)
        );
    }

    #[test]
    fn video_and_images_count_as_media() {
        for embed in [EmbedShape::Video, EmbedShape::Images { count: 2 }] {
            let mut e = entry("2025-03-01T11:59:00Z");
            e.embed = Some(embed);
            let record = classify(&e, &FilterRules::original_media(), now()).unwrap();
            assert!(record.shape.has_media);
        }
    }

    #[test]
    fn media_inside_record_with_media_is_seen() {
        let e = FeedEntry {
            embed: Some(EmbedShape::RecordWithMedia {
                media: Box::new(EmbedShape::Images { count: 1 }),
            }),
            ..entry("2025-03-01T11:59:00Z")
        };
        let media_only = FilterRules {
            media_only: true,
            ..FilterRules::default()
        };
        let record = classify(&e, &media_only, now()).unwrap();
        assert!(record.shape.has_media);
        assert!(record.shape.is_quote);
    }

    #[test]
    fn window_cutoff() {
        let rules = FilterRules::windowed(2);
        assert!(classify(&entry("2025-03-01T10:00:00Z"), &rules, now()).is_ok());
        assert_eq!(
            classify(&entry("2025-03-01T09:59:59Z"), &rules, now()),
            Err(Rejection::OutsideWindow)
        );
    }

    #[test]
    fn batch_tally_counts_each_reason() {
        let mut reply = entry("2025-03-01T11:00:00Z");
        reply.reply_parent = true;
        let old = entry("2025-02-01T11:00:00Z");
        let ok = entry("2025-03-01T11:00:00Z");

        let out = filter_entries(&[reply, old, ok], &FilterRules::windowed(2), now());
        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.rejected(), 2);
        assert_eq!(out.rejections.get(&Rejection::Reply), Some(&1));
        assert_eq!(out.rejections.get(&Rejection::OutsideWindow), Some(&1));
    }
}
