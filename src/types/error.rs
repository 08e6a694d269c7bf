//! Error types for archiver

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Exit code for a missing required argument.
pub const EXIT_MISSING_ARGUMENT: i32 = 1;
/// Exit code for a path that exists but is not a directory.
pub const EXIT_NOT_A_DIRECTORY: i32 = 2;
/// Exit code for per-file failures when strict mode is on.
pub const EXIT_PARTIAL_FAILURE: i32 = 3;
/// Exit code for usage and validation errors.
pub const EXIT_USAGE: i32 = 64;
/// Exit code for a run stopped by Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Fatal errors: any of these aborts the run before (or instead of) copying.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A required flag was not supplied
    #[error("Missing argument {flag} : {help}")]
    MissingArgument {
        flag: &'static str,
        help: &'static str,
    },

    /// Source and destination resolve to the same directory
    #[error("Source and Destination cannot match")]
    SameDirectory,

    /// Worker count below one
    #[error("Concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    /// Path could not be stat'ed
    #[error("Unable to validate {role} directory {path}: {source}")]
    Unreadable {
        role: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Path exists but is something other than a directory
    #[error("{role} is not a directory: {path}")]
    NotADirectory { role: &'static str, path: PathBuf },

    /// Source directory listing failed
    #[error("Unable to read source directory {path}: {source}")]
    Enumeration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Worker pool or runtime failure
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl ArchiveError {
    /// Process exit code reported to operators for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ArchiveError::MissingArgument { .. } => EXIT_MISSING_ARGUMENT,
            ArchiveError::NotADirectory { .. } => EXIT_NOT_A_DIRECTORY,
            ArchiveError::Io(_)
            | ArchiveError::SameDirectory
            | ArchiveError::InvalidConcurrency(_)
            | ArchiveError::Unreadable { .. }
            | ArchiveError::Enumeration { .. }
            | ArchiveError::Runtime(_) => EXIT_USAGE,
        }
    }
}

/// Per-file copy failure. Scoped to one file; never fatal to the run.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed on {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write failed on {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot rename to {path}: {source}")]
    Rename {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot set permissions on {path}: {source}")]
    Chmod {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CopyError {
    /// Short stage name used in log lines.
    pub fn stage(&self) -> &'static str {
        match self {
            CopyError::Open { .. } => "open",
            CopyError::Create { .. } => "create",
            CopyError::Read { .. } => "read",
            CopyError::Write { .. } => "write",
            CopyError::Rename { .. } => "rename",
            CopyError::Chmod { .. } => "chmod",
        }
    }

    /// Path the failing operation was applied to
    pub fn path(&self) -> &Path {
        match self {
            CopyError::Open { path, .. }
            | CopyError::Create { path, .. }
            | CopyError::Read { path, .. }
            | CopyError::Write { path, .. }
            | CopyError::Rename { path, .. }
            | CopyError::Chmod { path, .. } => path,
        }
    }

}
