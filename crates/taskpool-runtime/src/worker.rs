//! Worker thread management
//!
//! A fixed set of long-lived OS threads pulling jobs from the shared
//! `BoundedQueue`. No per-job thread creation and no dynamic scaling.
//!
//! Each worker loops: dequeue, execute (which completes the job's future
//! and may fire its continuation), drop the job. The `None` sentinel from
//! a shut-down, drained queue ends the loop.

use crate::job::Execute;
use crate::queue::BoundedQueue;
use taskpool_core::{kdebug, kerror, ktrace};
use taskpool_core::WorkerError;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Queue type shared by submitters and workers
pub type JobQueue = BoundedQueue<Box<dyn Execute>>;

#[derive(Default)]
struct Counters {
    /// Workers currently executing a job
    active: AtomicUsize,
    /// Jobs that ran to completion
    executed: AtomicU64,
    /// Jobs that panicked
    panicked: AtomicU64,
}

/// Pool of worker threads
pub struct WorkerPool {
    handles: Mutex<Vec<JoinHandle<()>>>,
    queue: Arc<JobQueue>,
    counters: Arc<Counters>,
    num_workers: usize,
}

impl WorkerPool {
    /// Spawn `num_workers` threads named `{prefix}-{index}`
    ///
    /// If any spawn fails, the queue is shut down, the threads already
    /// started are joined and `SpawnFailed` is returned.
    pub fn start(
        num_workers: usize,
        prefix: &str,
        queue: Arc<JobQueue>,
    ) -> Result<Self, WorkerError> {
        let counters = Arc::new(Counters::default());
        let mut handles = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let queue_w = Arc::clone(&queue);
            let counters_w = Arc::clone(&counters);
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", prefix, worker_id))
                .spawn(move || worker_loop(worker_id, queue_w, counters_w));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    kerror!("failed to spawn worker {}: {}", worker_id, e);
                    queue.shutdown();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(WorkerError::SpawnFailed);
                }
            }
        }

        Ok(Self {
            handles: Mutex::new(handles),
            queue,
            counters,
            num_workers,
        })
    }

    /// Stop handing out new jobs once the queue drains. Does not block.
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }

    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.queue.is_shutdown()
    }

    /// Wait for all workers to exit
    ///
    /// Only returns once the queue has been shut down and drained.
    /// Calling it again is a no-op. The handle list is not locked while
    /// joining, so jobs may query the pool during shutdown.
    pub fn join(&self) -> Result<(), WorkerError> {
        let handles = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let mut result = Ok(());
        for handle in handles {
            if handle.join().is_err() {
                result = Err(WorkerError::Panicked);
            }
        }
        result
    }

    #[inline]
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Workers alive (not yet joined)
    #[inline]
    pub fn live_workers(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    #[inline]
    pub fn active_workers(&self) -> usize {
        self.counters.active.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn executed(&self) -> u64 {
        self.counters.executed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn panicked(&self) -> u64 {
        self.counters.panicked.load(Ordering::Relaxed)
    }
}

thread_local! {
    static CURRENT_WORKER_ID: std::cell::Cell<usize> = const { std::cell::Cell::new(usize::MAX) };
}

/// Index of the worker running on this thread, if any
#[inline]
pub fn current_worker_id() -> Option<usize> {
    let id = CURRENT_WORKER_ID.with(|cell| cell.get());
    (id != usize::MAX).then_some(id)
}

fn worker_loop(worker_id: usize, queue: Arc<JobQueue>, counters: Arc<Counters>) {
    CURRENT_WORKER_ID.with(|cell| cell.set(worker_id));
    kdebug!("worker {} started", worker_id);

    while let Some(job) = queue.dequeue() {
        let id = job.future_id();
        ktrace!("worker {} running {}", worker_id, id);

        counters.active.fetch_add(1, Ordering::Relaxed);
        let outcome = panic::catch_unwind(AssertUnwindSafe(move || job.execute()));
        counters.active.fetch_sub(1, Ordering::Relaxed);

        match outcome {
            Ok(()) => {
                counters.executed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                // The future stays pending; anyone blocked in get() on it
                // waits forever.
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                kerror!("worker {}: job for {} panicked; future left pending", worker_id, id);
            }
        }
    }

    kdebug!("worker {} exiting", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::TaskFuture;
    use crate::job::{ClosureJob, FnJob};
    use std::time::Duration;

    fn square(n: u64) -> u64 {
        n * n
    }

    #[test]
    fn test_workers_execute_jobs() {
        let queue = Arc::new(JobQueue::new(16));
        let pool = WorkerPool::start(2, "test-worker", Arc::clone(&queue)).unwrap();
        assert_eq!(pool.num_workers(), 2);

        let futures: Vec<_> = (0..10u64)
            .map(|n| {
                let fut = TaskFuture::new();
                queue
                    .enqueue(Box::new(FnJob::new(square, n, fut.clone())))
                    .unwrap();
                fut
            })
            .collect();

        for (n, fut) in futures.iter().enumerate() {
            assert_eq!(*fut.get(), (n * n) as u64);
        }

        pool.shutdown();
        pool.join().unwrap();
        assert_eq!(pool.executed(), 10);
        assert_eq!(pool.live_workers(), 0);
    }

    #[test]
    fn test_shutdown_drains_queued_jobs() {
        let queue = Arc::new(JobQueue::new(8));
        let futures: Vec<TaskFuture<u64>> = (0..8u64)
            .map(|n| {
                let fut = TaskFuture::new();
                queue
                    .enqueue(Box::new(ClosureJob::new(
                        move || {
                            thread::sleep(Duration::from_millis(5));
                            n
                        },
                        fut.clone(),
                    )))
                    .unwrap();
                fut
            })
            .collect();

        let pool = WorkerPool::start(3, "drain", Arc::clone(&queue)).unwrap();
        pool.shutdown();
        pool.join().unwrap();

        assert_eq!(pool.executed(), 8);
        assert!(futures.iter().all(|f| f.is_ready()));
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let queue = Arc::new(JobQueue::new(8));
        let pool = WorkerPool::start(1, "panicky", Arc::clone(&queue)).unwrap();

        let doomed: TaskFuture<u8> = TaskFuture::new();
        queue
            .enqueue(Box::new(ClosureJob::new(|| panic!("job failure"), doomed.clone())))
            .unwrap();

        let fine = TaskFuture::new();
        queue
            .enqueue(Box::new(ClosureJob::new(|| 9u8, fine.clone())))
            .unwrap();

        assert_eq!(*fine.get(), 9);
        pool.shutdown();
        pool.join().unwrap();

        assert!(!doomed.is_ready());
        assert_eq!(pool.panicked(), 1);
        assert_eq!(pool.executed(), 1);
    }

    #[test]
    fn test_worker_id_is_set_on_worker_threads() {
        assert_eq!(current_worker_id(), None);

        let queue = Arc::new(JobQueue::new(4));
        let pool = WorkerPool::start(1, "ident", Arc::clone(&queue)).unwrap();
        let fut = TaskFuture::new();
        queue
            .enqueue(Box::new(ClosureJob::new(current_worker_id, fut.clone())))
            .unwrap();

        assert_eq!(*fut.get(), Some(0));
        pool.shutdown();
        pool.join().unwrap();
    }
}
