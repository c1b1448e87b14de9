// Skycurate: feed curation and re-broadcast for Bluesky
//
// This is the library root. Each module corresponds to one stage of the
// fetch -> filter -> select -> act -> persist pipeline, plus the ambient
// pieces around it.

pub mod bluesky;
pub mod config;
pub mod curation;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod status;
