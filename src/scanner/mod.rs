//! Source directory scanning

mod listing;

pub use listing::{list_source, SkipReason, SkippedEntry, SourceListing};
