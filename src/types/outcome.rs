//! CopyOutcome - the per-file result handed back by a Worker

use super::{CopyError, DirectoryEntry};

/// Result of processing one dequeued entry
#[derive(Debug)]
pub struct CopyOutcome {
    /// The entry the Worker claimed
    pub entry: DirectoryEntry,

    /// Bytes copied, or the stage that failed
    pub result: Result<u64, CopyError>,
}

impl CopyOutcome {
    pub fn new(entry: DirectoryEntry, result: Result<u64, CopyError>) -> Self {
        Self { entry, result }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&CopyError> {
        self.result.as_ref().err()
    }

    /// Bytes copied (zero on failure)
    pub fn bytes_copied(&self) -> u64 {
        self.result.as_ref().copied().unwrap_or(0)
    }
}
