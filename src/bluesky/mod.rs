// Bluesky API surface — session, feed reads, repost/like writes.
//
// `feed` and `actions` each define the trait the pipelines depend on and
// implement it for `AtpClient`, so tests can swap in fakes.

pub mod actions;
pub mod client;
pub mod feed;
