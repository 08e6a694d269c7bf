//! Core type definitions for archiver

mod entry;
mod error;
mod outcome;

pub use entry::{is_hidden, DirectoryEntry, HIDDEN_MARKER};
pub use error::{
    ArchiveError, CopyError, EXIT_INTERRUPTED, EXIT_MISSING_ARGUMENT, EXIT_NOT_A_DIRECTORY,
    EXIT_PARTIAL_FAILURE, EXIT_USAGE,
};
pub use outcome::CopyOutcome;
