//! # archiver - Flat Directory Archiver
//!
//! Copies every regular, non-hidden file of one directory into another with
//! a bounded pool of workers. Each file lands through a staging file and a
//! rename, so a partially written file is never visible under its final name.

// Module declarations
pub mod commands;
pub mod config;
pub mod executor;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use config::{Cli, Config};
pub use types::{ArchiveError, CopyError, CopyOutcome, DirectoryEntry};
