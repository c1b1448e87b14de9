// Curation core — candidate filtering and selection.
//
// Pure functions over normalized feed entries. No network, no filesystem.

pub mod filter;
pub mod models;
pub mod select;
