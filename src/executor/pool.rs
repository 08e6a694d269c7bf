//! Bounded worker pool for archive copies.
//!
//! One producer, N consumers:
//! - a single bounded `mpsc` queue of `DirectoryEntry` values
//! - the receiver is shared by every worker behind an async mutex
//! - dropping the sender closes the queue; workers drain it, then exit
//! - each copy runs on the blocking pool with the worker's own buffer

use super::cancel::CancelToken;
use super::copy::{copy_entry, CopyBuffer};
use crate::types::{ArchiveError, CopyOutcome, DirectoryEntry};
use crate::Config;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{mpsc, Mutex};
use tokio::task::{self, JoinHandle};

use std::sync::Arc;

/// Observer invoked once per dequeued entry that was attempted.
pub type OutcomeCallback = dyn Fn(&CopyOutcome) + Send + Sync;

type SharedQueue = Arc<Mutex<mpsc::Receiver<DirectoryEntry>>>;

/// Counters for one pool lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub dispatched: usize,
    pub copied: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub bytes_copied: u64,
    pub per_worker_completed: Vec<usize>,
}

impl PoolStats {
    fn new(workers: usize) -> Self {
        Self {
            workers,
            dispatched: 0,
            copied: 0,
            failed: 0,
            cancelled: 0,
            bytes_copied: 0,
            per_worker_completed: vec![0; workers],
        }
    }
}

/// Pool coordinator: owns the runtime, the queue and the worker tasks.
pub struct WorkerPool {
    runtime: Runtime,
    queue_tx: Option<mpsc::Sender<DirectoryEntry>>,
    worker_handles: Vec<JoinHandle<()>>,
    stats: Arc<Mutex<PoolStats>>,
    cancel: CancelToken,
}

impl WorkerPool {
    /// Start `config.concurrency` workers sharing one queue of
    /// `config.queue_capacity` slots. All workers exist before the first
    /// entry can be enqueued.
    pub fn new(
        config: Arc<Config>,
        cancel: CancelToken,
        on_outcome: Option<Arc<OutcomeCallback>>,
    ) -> Result<Self, ArchiveError> {
        let workers = config.concurrency.max(1);
        let capacity = config.queue_capacity.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("archiver-worker")
            .enable_all()
            .build()
            .map_err(ArchiveError::Io)?;

        let stats = Arc::new(Mutex::new(PoolStats::new(workers)));
        let (queue_tx, queue_rx) = mpsc::channel::<DirectoryEntry>(capacity);
        let queue: SharedQueue = Arc::new(Mutex::new(queue_rx));

        let worker_handles = (0..workers)
            .map(|worker_id| {
                runtime.spawn(worker_loop(
                    worker_id,
                    Arc::clone(&queue),
                    Arc::clone(&config),
                    Arc::clone(&stats),
                    cancel.clone(),
                    on_outcome.clone(),
                ))
            })
            .collect();

        tracing::debug!(workers, capacity, "worker pool started");

        Ok(Self {
            runtime,
            queue_tx: Some(queue_tx),
            worker_handles,
            stats,
            cancel,
        })
    }

    /// Push one entry, blocking while the queue is full.
    ///
    /// Returns `Ok(false)` without queueing once cancellation was requested.
    pub fn enqueue(&self, entry: DirectoryEntry) -> Result<bool, ArchiveError> {
        if self.cancel.is_cancelled() {
            return Ok(false);
        }
        let sender = self
            .queue_tx
            .as_ref()
            .ok_or_else(|| ArchiveError::Runtime("work queue is already closed".to_string()))?;
        let stats = Arc::clone(&self.stats);

        self.runtime.block_on(async {
            sender.send(entry).await.map_err(|_| {
                ArchiveError::Runtime("all workers exited before the queue closed".to_string())
            })?;

            let mut guard = stats.lock().await;
            guard.dispatched += 1;
            Ok(true)
        })
    }

    /// Close the queue. Workers finish what is queued, then exit.
    pub fn close(&mut self) {
        self.queue_tx.take();
    }

    /// Request cancellation on the first Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) {
        let cancel = self.cancel.clone();
        self.runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing in-flight copies");
                cancel.cancel();
            }
        });
    }

    /// Close queue input and wait for every worker to drain it and exit.
    pub fn close_and_wait(mut self) -> Result<PoolStats, ArchiveError> {
        self.close();

        let workers = std::mem::take(&mut self.worker_handles);
        let stats = Arc::clone(&self.stats);

        self.runtime.block_on(async move {
            for handle in workers {
                handle.await.map_err(map_join_error)?;
            }
            Ok(stats.lock().await.clone())
        })
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: SharedQueue,
    config: Arc<Config>,
    stats: Arc<Mutex<PoolStats>>,
    cancel: CancelToken,
    on_outcome: Option<Arc<OutcomeCallback>>,
) {
    let mut buffer = Some(CopyBuffer::new());

    loop {
        let next = queue.lock().await.recv().await;
        let Some(entry) = next else {
            break;
        };

        if cancel.is_cancelled() {
            tracing::debug!(worker = worker_id, file = %entry.display_name(), "cancelled");
            stats.lock().await.cancelled += 1;
            continue;
        }

        let name = entry.display_name();
        let shared = Arc::clone(&config);
        let mut scratch = buffer.take().unwrap_or_default();
        let joined = task::spawn_blocking(move || {
            let result = copy_entry(&shared, &entry, &mut scratch);
            (scratch, CopyOutcome::new(entry, result))
        })
        .await;

        let outcome = match joined {
            Ok((scratch, outcome)) => {
                buffer = Some(scratch);
                outcome
            }
            Err(e) => {
                tracing::error!(worker = worker_id, file = %name, error = %e, "copy task aborted");
                let mut guard = stats.lock().await;
                guard.failed += 1;
                if let Some(slot) = guard.per_worker_completed.get_mut(worker_id) {
                    *slot += 1;
                }
                continue;
            }
        };

        report(worker_id, &outcome);
        {
            let mut guard = stats.lock().await;
            if outcome.is_success() {
                guard.copied += 1;
                guard.bytes_copied += outcome.bytes_copied();
            } else {
                guard.failed += 1;
            }
            if let Some(slot) = guard.per_worker_completed.get_mut(worker_id) {
                *slot += 1;
            }
        }
        if let Some(callback) = &on_outcome {
            callback(&outcome);
        }
    }
    // buffer released here
}

fn report(worker_id: usize, outcome: &CopyOutcome) {
    let name = outcome.entry.display_name();
    match outcome.error() {
        None => tracing::info!(
            worker = worker_id,
            file = %name,
            bytes = outcome.bytes_copied(),
            "copied"
        ),
        Some(err) => tracing::error!(
            worker = worker_id,
            file = %name,
            stage = err.stage(),
            path = %err.path().display(),
            error = %err,
            "copy failed"
        ),
    }
}

fn map_join_error(error: tokio::task::JoinError) -> ArchiveError {
    ArchiveError::Runtime(format!("worker task failed: {}", error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    fn setup(files: usize, workers: usize) -> (TempDir, TempDir, Arc<Config>) {
        let src = TempDir::new().expect("create src tempdir");
        let dst = TempDir::new().expect("create dst tempdir");
        for i in 0..files {
            fs::write(src.path().join(format!("f{:03}.txt", i)), format!("payload {}", i))
                .expect("write source file");
        }
        let config = Arc::new(Config::new(src.path(), dst.path(), workers));
        (src, dst, config)
    }

    fn entry(i: usize) -> DirectoryEntry {
        DirectoryEntry::new(format!("f{:03}.txt", i), 0o644, 0)
    }

    #[test]
    fn test_pool_copies_every_entry_once() {
        let (_src, dst, config) = setup(64, 4);
        let pool = WorkerPool::new(config, CancelToken::new(), None).expect("create pool");
        for i in 0..64 {
            assert!(pool.enqueue(entry(i)).expect("enqueue"));
        }

        let stats = pool.close_and_wait().expect("close and wait");
        assert_eq!(stats.workers, 4);
        assert_eq!(stats.dispatched, 64);
        assert_eq!(stats.copied, 64);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.per_worker_completed.iter().sum::<usize>(), 64);
        assert_eq!(fs::read_dir(dst.path()).expect("list dest").count(), 64);
    }

    #[test]
    fn test_pool_shutdowns_cleanly_without_jobs() {
        let (_src, _dst, config) = setup(0, 2);
        let pool = WorkerPool::new(config, CancelToken::new(), None).expect("create pool");
        let stats = pool.close_and_wait().expect("close and wait");
        assert_eq!(stats.dispatched, 0);
        assert_eq!(stats.copied + stats.failed + stats.cancelled, 0);
    }

    #[test]
    fn test_pool_enforces_minimum_one_worker() {
        let (_src, dst, mut config) = setup(1, 1);
        Arc::make_mut(&mut config).concurrency = 0;
        Arc::make_mut(&mut config).queue_capacity = 0;
        let pool = WorkerPool::new(config, CancelToken::new(), None).expect("create pool");
        pool.enqueue(entry(0)).expect("enqueue");

        let stats = pool.close_and_wait().expect("close and wait");
        assert_eq!(stats.workers, 1);
        assert_eq!(stats.copied, 1);
        assert!(dst.path().join("f000.txt").exists());
    }

    #[test]
    fn test_failures_do_not_stop_other_workers() {
        let (_src, dst, config) = setup(3, 2);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let observer: Arc<OutcomeCallback> = {
            let seen = Arc::clone(&seen);
            Arc::new(move |outcome: &CopyOutcome| {
                seen.lock()
                    .expect("lock outcomes")
                    .push((outcome.entry.display_name(), outcome.is_success()));
            })
        };

        let pool =
            WorkerPool::new(config, CancelToken::new(), Some(observer)).expect("create pool");
        pool.enqueue(entry(0)).expect("enqueue");
        pool.enqueue(DirectoryEntry::new("missing.txt", 0o644, 0))
            .expect("enqueue");
        pool.enqueue(entry(2)).expect("enqueue");

        let stats = pool.close_and_wait().expect("close and wait");
        assert_eq!(stats.copied, 2);
        assert_eq!(stats.failed, 1);
        assert!(dst.path().join("f000.txt").exists());
        assert!(dst.path().join("f002.txt").exists());

        let mut seen = seen.lock().expect("lock outcomes").clone();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                ("f000.txt".to_string(), true),
                ("f002.txt".to_string(), true),
                ("missing.txt".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_enqueue_after_close_is_rejected() {
        let (_src, _dst, config) = setup(1, 1);
        let mut pool = WorkerPool::new(config, CancelToken::new(), None).expect("create pool");
        pool.close();
        assert!(matches!(
            pool.enqueue(entry(0)),
            Err(ArchiveError::Runtime(_))
        ));
        pool.close_and_wait().expect("close and wait");
    }

    #[test]
    fn test_cancelled_pool_stops_accepting_work() {
        let (_src, dst, config) = setup(4, 2);
        let cancel = CancelToken::new();
        let pool = WorkerPool::new(config, cancel.clone(), None).expect("create pool");
        assert!(pool.enqueue(entry(0)).expect("enqueue"));

        cancel.cancel();
        assert!(!pool.enqueue(entry(1)).expect("enqueue after cancel"));

        let stats = pool.close_and_wait().expect("close and wait");
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.copied + stats.cancelled, 1);
        assert!(!dst.path().join("f001.txt").exists());
    }
}
