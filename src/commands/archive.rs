//! Main archive command

use crate::executor::{dispatch, CancelToken, DispatchSummary, OutcomeCallback, PoolStats, WorkerPool};
use crate::types::{ArchiveError, EXIT_INTERRUPTED, EXIT_PARTIAL_FAILURE};
use crate::Config;
use std::sync::Arc;

/// Optional collaborators for a run
#[derive(Clone, Default)]
pub struct RunHooks {
    /// Stop signal shared with the caller
    pub cancel: CancelToken,

    /// Called with every per-file outcome
    pub on_outcome: Option<Arc<OutcomeCallback>>,

    /// Wire Ctrl-C to `cancel`
    pub handle_ctrl_c: bool,
}

/// Result of one complete archive run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub dispatch: DispatchSummary,
    pub stats: PoolStats,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.stats.failed > 0
    }

    /// Process exit code for a run that got past validation and listing.
    ///
    /// Per-file failures only change the code in strict mode.
    pub fn exit_code(&self, strict: bool) -> i32 {
        if self.cancelled {
            EXIT_INTERRUPTED
        } else if strict && self.has_failures() {
            EXIT_PARTIAL_FAILURE
        } else {
            0
        }
    }
}

/// Run the archive operation
pub fn run(config: &Config) -> Result<RunSummary, ArchiveError> {
    run_with(config, RunHooks::default())
}

/// Run the archive operation with a caller-supplied cancel token and observer
///
/// Workers are started first, then the source is listed and dispatched, then
/// the pool is drained. Per-file failures are reported, never returned.
pub fn run_with(config: &Config, hooks: RunHooks) -> Result<RunSummary, ArchiveError> {
    let shared = Arc::new(config.clone());
    let mut pool = WorkerPool::new(Arc::clone(&shared), hooks.cancel.clone(), hooks.on_outcome)?;
    if hooks.handle_ctrl_c {
        pool.cancel_on_ctrl_c();
    }

    tracing::info!(
        source = %shared.source.display(),
        destination = %shared.destination.display(),
        workers = shared.concurrency.max(1),
        "archiving"
    );

    let dispatched = dispatch(&shared.source, &mut pool);
    let stats = pool.close_and_wait()?;
    let dispatch = dispatched?;

    let cancelled = hooks.cancel.is_cancelled();
    tracing::info!(
        copied = stats.copied,
        failed = stats.failed,
        cancelled = stats.cancelled + dispatch.withheld,
        skipped = dispatch.skipped,
        bytes = stats.bytes_copied,
        "Finishing up"
    );
    if stats.failed > 0 {
        tracing::warn!(
            failed = stats.failed,
            "some files were not archived; re-run the batch to retry them"
        );
    }

    Ok(RunSummary {
        dispatch,
        stats,
        cancelled,
    })
}
