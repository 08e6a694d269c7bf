//! Dispatcher: the single producer feeding the worker pool

use super::pool::WorkerPool;
use crate::scanner::{list_source, SkipReason};
use crate::types::ArchiveError;
use std::path::Path;

/// What the dispatcher saw and sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Children of the source directory
    pub listed: usize,
    /// Entries pushed onto the queue
    pub queued: usize,
    /// Hidden, directory, special and unresolvable entries
    pub skipped: usize,
    /// Eligible entries never queued because the run was cancelled
    pub withheld: usize,
}

/// List `source` once, queue every eligible entry in name order, then close
/// the queue.
///
/// The queue is closed on every path out of this function, so workers always
/// terminate. A listing failure queues nothing.
pub fn dispatch(source: &Path, pool: &mut WorkerPool) -> Result<DispatchSummary, ArchiveError> {
    let listing = match list_source(source) {
        Ok(listing) => listing,
        Err(err) => {
            pool.close();
            return Err(err);
        }
    };

    for skipped in &listing.skipped {
        let name = skipped.name.to_string_lossy();
        match skipped.reason {
            SkipReason::DanglingSymlink => {
                tracing::warn!(file = %name, "skipping unresolvable symlink")
            }
            reason => tracing::debug!(file = %name, reason = reason.as_str(), "skipping"),
        }
    }

    let mut summary = DispatchSummary {
        listed: listing.total(),
        skipped: listing.skipped.len(),
        ..Default::default()
    };
    let eligible = listing.eligible.len();

    for entry in listing.eligible {
        match pool.enqueue(entry) {
            Ok(true) => summary.queued += 1,
            Ok(false) => break,
            Err(err) => {
                pool.close();
                return Err(err);
            }
        }
    }
    summary.withheld = eligible - summary.queued;

    pool.close();
    Ok(summary)
}
