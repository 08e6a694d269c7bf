//! Executor module: atomic copier, dispatcher and worker pool

pub mod cancel;
pub mod copy;
pub mod dispatch;
pub mod pool;

pub use cancel::CancelToken;
pub use copy::{copy_entry, CopyBuffer, COPY_BUFFER_SIZE, PART_SUFFIX};
pub use dispatch::{dispatch, DispatchSummary};
pub use pool::{OutcomeCallback, PoolStats, WorkerPool};
