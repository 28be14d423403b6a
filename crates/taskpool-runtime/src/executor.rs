//! The executor: one queue, one worker pool, one continuation registry
//!
//! Everything lives on an `Executor` instance; there is no process-wide
//! state, so independent executors (and tests) do not interfere.
//!
//! ```ignore
//! let exec = Executor::init(Some(2))?;
//! let fut = exec.submit(|n: i32| n * 42, &5)?;
//! exec.then(&fut, |v| println!("got {}", v));
//! exec.run_loop();
//! exec.shutdown();
//! ```

use crate::config::PoolConfig;
use crate::future::TaskFuture;
use crate::job::{copy_arg_bytes, ArgCopyError, ClosureJob, Execute, FnJob};
use crate::registry::{Registry, RunStats};
use crate::worker::{JobQueue, WorkerPool};
use crate::queue::QueueError;
use taskpool_core::{kdebug, kerror, kinfo, kwarn};
use taskpool_core::{ExecError, ExecResult, ThenOutcome};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Point-in-time counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Jobs accepted into the queue
    pub submitted: u64,
    /// Jobs rejected because the queue was full
    pub dropped: u64,
    /// Jobs that ran to completion
    pub executed: u64,
    /// Jobs that panicked
    pub panicked: u64,
    /// Workers currently running a job
    pub active_workers: usize,
    /// Jobs waiting in the queue
    pub queued: usize,
    /// Futures whose continuation has not fired yet
    pub tracked: usize,
}

pub struct Executor {
    config: PoolConfig,
    queue: Arc<JobQueue>,
    registry: Arc<Registry>,
    /// Set once by `start()`; never locked afterwards
    pool: OnceLock<WorkerPool>,
    start_lock: Mutex<()>,
    submitted: AtomicU64,
    dropped: AtomicU64,
}

impl Executor {
    /// Build an executor without starting workers
    ///
    /// Jobs submitted before `start()` wait in the queue.
    pub fn new(config: PoolConfig) -> ExecResult<Self> {
        config.validate()?;
        let queue = Arc::new(JobQueue::new(config.queue_capacity));
        let registry = Arc::new(Registry::new(
            config.poll_interval,
            config.continuation_dispatch,
        ));
        Ok(Self {
            config,
            queue,
            registry,
            pool: OnceLock::new(),
            start_lock: Mutex::new(()),
            submitted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Build and start an executor
    ///
    /// `worker_count` defaults to the host's parallelism. Other settings
    /// come from the environment (`PoolConfig::from_env`).
    pub fn init(worker_count: Option<usize>) -> ExecResult<Self> {
        let mut config = PoolConfig::from_env();
        if let Some(n) = worker_count {
            config = config.num_workers(n);
        }
        let exec = Self::new(config)?;
        exec.start()?;
        Ok(exec)
    }

    /// Spawn the worker threads
    pub fn start(&self) -> ExecResult<()> {
        let _guard = self.start_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.pool.get().is_some() {
            return Err(ExecError::AlreadyStarted);
        }
        if self.queue.is_shutdown() {
            return Err(ExecError::ShutDown);
        }
        let started = WorkerPool::start(
            self.config.num_workers,
            &self.config.thread_name_prefix,
            Arc::clone(&self.queue),
        )?;
        kinfo!(
            "taskpool started: {} workers, queue capacity {}",
            started.num_workers(),
            self.queue.capacity()
        );
        self.pool.set(started).map_err(|_| ExecError::AlreadyStarted)
    }

    #[inline]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.pool.get().is_some()
    }

    fn new_future<R: Send + Sync + 'static>(&self) -> TaskFuture<R> {
        TaskFuture::with_registry(Arc::clone(&self.registry))
    }

    fn enqueue<R>(&self, job: Box<dyn Execute>, future: TaskFuture<R>) -> ExecResult<TaskFuture<R>> {
        match self.queue.enqueue(job) {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(future)
            }
            Err(QueueError::Full(job)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                kwarn!(
                    "job queue overflow (capacity {}), {} dropped",
                    self.queue.capacity(),
                    job.future_id()
                );
                Err(ExecError::QueueFull)
            }
            Err(QueueError::Closed(job)) => {
                kdebug!("submit after shutdown, {} rejected", job.future_id());
                Err(ExecError::ShutDown)
            }
        }
    }

    /// Submit `func(arg)`; the argument is cloned into the job
    ///
    /// Fails with `QueueFull` (job dropped) or `ShutDown`. On failure no
    /// future is handed out, so nothing can wait on a job that will never
    /// run.
    pub fn submit<A, R>(&self, func: fn(A) -> R, arg: &A) -> ExecResult<TaskFuture<R>>
    where
        A: Clone + Send + 'static,
        R: Send + Sync + 'static,
    {
        let future = self.new_future();
        let job = FnJob::new(func, arg.clone(), future.clone());
        self.enqueue(Box::new(job), future)
    }

    /// Submit `func(bytes)` with the first `size` bytes of `arg` copied
    /// into a freshly allocated buffer
    pub fn submit_bytes<R>(
        &self,
        func: fn(Vec<u8>) -> R,
        arg: &[u8],
        size: usize,
    ) -> ExecResult<TaskFuture<R>>
    where
        R: Send + Sync + 'static,
    {
        let bytes = copy_arg_bytes(arg, size).map_err(|e| match e {
            ArgCopyError::SizeExceedsBuffer => {
                ExecError::InvalidArgument("declared size exceeds argument buffer")
            }
            ArgCopyError::AllocationFailed => {
                kerror!("failed to allocate {} bytes for job argument", size);
                ExecError::AllocationFailed(size)
            }
        })?;
        let future = self.new_future();
        let job = FnJob::new(func, bytes, future.clone());
        self.enqueue(Box::new(job), future)
    }

    /// Submit a closure
    pub fn spawn<F, R>(&self, func: F) -> ExecResult<TaskFuture<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + Sync + 'static,
    {
        let future = self.new_future();
        let job = ClosureJob::new(func, future.clone());
        self.enqueue(Box::new(job), future)
    }

    /// Submit and register a continuation in one call
    pub fn submit_then<A, R, C>(
        &self,
        func: fn(A) -> R,
        arg: &A,
        cont: C,
    ) -> ExecResult<TaskFuture<R>>
    where
        A: Clone + Send + 'static,
        R: Send + Sync + 'static,
        C: FnOnce(Arc<R>) + Send + 'static,
    {
        let future = self.submit(func, arg)?;
        future.then(cont);
        Ok(future)
    }

    /// Register a continuation on `future`; see `TaskFuture::then`
    pub fn then<R, C>(&self, future: &TaskFuture<R>, cont: C) -> ThenOutcome
    where
        R: Send + Sync + 'static,
        C: FnOnce(Arc<R>) + Send + 'static,
    {
        future.then(cont)
    }

    pub fn is_ready<R: Send + Sync + 'static>(&self, future: &TaskFuture<R>) -> bool {
        future.is_ready()
    }

    /// Block until `future` completes
    pub fn get<R: Send + Sync + 'static>(&self, future: &TaskFuture<R>) -> Arc<R> {
        future.get()
    }

    /// Release a future handle
    pub fn destroy<R: Send + Sync + 'static>(&self, future: TaskFuture<R>) {
        future.destroy();
    }

    /// Block the calling thread until every registered continuation fired
    pub fn run_loop(&self) -> RunStats {
        self.registry.run()
    }

    /// Declare shutdown and return without waiting
    ///
    /// Queued and running jobs still finish; new submissions fail with
    /// `ShutDown`. Idempotent.
    pub fn shutdown(&self) {
        if !self.queue.is_shutdown() {
            kinfo!("taskpool shutting down ({} jobs queued)", self.queue.len());
        }
        self.queue.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.queue.is_shutdown()
    }

    /// Wait for all workers to exit
    ///
    /// Workers exit only after `shutdown()` and once the queue is drained.
    /// Jobs may still call `stats()` or `is_started()` while this waits.
    pub fn join(&self) -> ExecResult<()> {
        match self.pool.get() {
            Some(p) => p.join().map_err(ExecError::from),
            None => Err(ExecError::NotStarted),
        }
    }

    pub fn stats(&self) -> ExecutorStats {
        let (executed, panicked, active_workers) = self
            .pool
            .get()
            .map(|p| (p.executed(), p.panicked(), p.active_workers()))
            .unwrap_or_default();
        ExecutorStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            executed,
            panicked,
            active_workers,
            queued: self.queue.len(),
            tracked: self.registry.pending(),
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(pool) = self.pool.get() {
            if pool.join().is_err() {
                kerror!("worker thread panicked during shutdown");
            }
        }
        self.registry.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ContinuationDispatch;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn times_42(n: i32) -> i32 {
        n * 42
    }

    fn config(workers: usize, capacity: usize) -> PoolConfig {
        PoolConfig::new()
            .num_workers(workers)
            .queue_capacity(capacity)
            .thread_name_prefix("exec-test")
    }

    #[test]
    fn test_submit_and_get() {
        let exec = Executor::new(config(2, 16)).unwrap();
        exec.start().unwrap();

        let fut = exec.submit(times_42, &5).unwrap();
        assert_eq!(*exec.get(&fut), 210);
        assert!(exec.is_ready(&fut));
        exec.destroy(fut);
    }

    #[test]
    fn test_continuation_with_run_loop_records_once() {
        let exec = Executor::new(config(2, 16)).unwrap();
        exec.start().unwrap();

        let recorded = Arc::new(Mutex::new(Vec::new()));
        let fut = exec.submit(times_42, &5).unwrap();
        let r = Arc::clone(&recorded);
        exec.then(&fut, move |v| r.lock().unwrap().push(*v));

        exec.run_loop();
        assert_eq!(*recorded.lock().unwrap(), vec![210]);

        // Nothing else fires later.
        exec.then(&fut, |_| panic!("second continuation must not run"));
        assert_eq!(recorded.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_overflow_capacity_four() {
        let exec = Executor::new(config(2, 4)).unwrap();

        let accepted: Vec<_> = (1..=4)
            .map(|n| exec.submit(times_42, &n).unwrap())
            .collect();
        assert_eq!(exec.submit(times_42, &5).unwrap_err(), ExecError::QueueFull);

        let stats = exec.stats();
        assert_eq!(stats.submitted, 4);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.queued, 4);

        exec.start().unwrap();
        for (n, fut) in (1..=4).zip(&accepted) {
            assert_eq!(*fut.get(), n * 42);
        }
    }

    #[test]
    fn test_fifo_dispatch_single_worker() {
        let exec = Executor::new(config(1, 16)).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let futures: Vec<_> = ["A", "B", "C"]
            .into_iter()
            .map(|name| {
                let order = Arc::clone(&order);
                exec.spawn(move || order.lock().unwrap().push(name)).unwrap()
            })
            .collect();

        exec.start().unwrap();
        for fut in &futures {
            fut.get();
        }
        assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_completion_order_not_assumed() {
        let exec = Executor::new(config(2, 16)).unwrap();
        exec.start().unwrap();

        let slow = exec
            .spawn(|| {
                thread::sleep(Duration::from_millis(30));
                "slow"
            })
            .unwrap();
        let fast = exec.spawn(|| "fast").unwrap();

        // Either may finish first; both finish with their own value.
        assert_eq!(*fast.get(), "fast");
        assert_eq!(*slow.get(), "slow");
    }

    #[test]
    fn test_drain_on_shutdown() {
        let exec = Executor::new(config(3, 32)).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        let futures: Vec<_> = (0..20)
            .map(|_| {
                let ran = Arc::clone(&ran);
                exec.spawn(move || {
                    thread::sleep(Duration::from_millis(2));
                    ran.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap()
            })
            .collect();

        exec.start().unwrap();
        exec.shutdown();
        exec.join().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 20);
        assert!(futures.iter().all(|f| f.is_ready()));
        assert_eq!(exec.stats().executed, 20);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let exec = Executor::new(config(1, 4)).unwrap();
        exec.start().unwrap();
        exec.shutdown();
        assert_eq!(exec.submit(times_42, &1).unwrap_err(), ExecError::ShutDown);
        assert_eq!(exec.stats().dropped, 0);
    }

    #[test]
    fn test_start_twice_fails() {
        let exec = Executor::new(config(1, 4)).unwrap();
        exec.start().unwrap();
        assert_eq!(exec.start().unwrap_err(), ExecError::AlreadyStarted);
    }

    #[test]
    fn test_job_can_read_stats_during_join() {
        let exec = Arc::new(Executor::new(config(1, 4)).unwrap());
        exec.start().unwrap();

        let inner = Arc::clone(&exec);
        let fut = exec
            .spawn(move || {
                thread::sleep(Duration::from_millis(50));
                inner.is_started() && inner.stats().submitted == 1
            })
            .unwrap();
        exec.shutdown();

        let (tx, rx) = std::sync::mpsc::channel();
        let joiner = {
            let exec = Arc::clone(&exec);
            thread::spawn(move || {
                let joined = exec.join();
                tx.send(joined).unwrap();
            })
        };

        let joined = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("join returned while a job was reading stats");
        assert!(joined.is_ok());
        joiner.join().unwrap();
        assert!(*fut.get());
        assert_eq!(exec.stats().executed, 1);
    }

    #[test]
    fn test_oversized_queue_capacity_rejected() {
        let err = Executor::new(config(1, usize::MAX)).err().unwrap();
        assert!(matches!(err, ExecError::Config(_)));
    }

    #[test]
    fn test_join_without_start() {
        let exec = Executor::new(config(1, 4)).unwrap();
        assert_eq!(exec.join().unwrap_err(), ExecError::NotStarted);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = Executor::new(config(0, 4)).err().unwrap();
        assert!(matches!(err, ExecError::Config(_)));
    }

    #[test]
    fn test_submit_bytes() {
        fn checksum(bytes: Vec<u8>) -> u32 {
            bytes.iter().map(|&b| b as u32).sum()
        }

        let exec = Executor::new(config(1, 4)).unwrap();
        exec.start().unwrap();

        let buf = [10u8, 20, 30, 40];
        let fut = exec.submit_bytes(checksum, &buf, 3).unwrap();
        assert_eq!(*fut.get(), 60);

        let err = exec.submit_bytes(checksum, &buf, 5).unwrap_err();
        assert!(matches!(err, ExecError::InvalidArgument(_)));
    }

    #[test]
    fn test_argument_is_copied() {
        fn total(v: Vec<u32>) -> u32 {
            v.into_iter().sum()
        }

        let exec = Executor::new(config(1, 4)).unwrap();
        let mut arg = vec![1, 2, 3];
        let fut = exec.submit(total, &arg).unwrap();
        arg.clear();
        arg.push(1000);

        exec.start().unwrap();
        assert_eq!(*fut.get(), 6);
    }

    #[test]
    fn test_submit_then_many_with_run_loop() {
        let exec = Executor::new(config(4, 64)).unwrap();
        exec.start().unwrap();

        let sum = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let futures: Vec<_> = (0..50)
            .map(|n: i32| {
                let (s, c) = (Arc::clone(&sum), Arc::clone(&calls));
                exec.submit_then(times_42, &n, move |v| {
                    s.fetch_add(*v as usize, Ordering::SeqCst);
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap()
            })
            .collect();

        exec.run_loop();

        assert_eq!(calls.load(Ordering::SeqCst), 50);
        assert_eq!(sum.load(Ordering::SeqCst), (0..50).map(|n| n * 42).sum::<usize>());
        assert_eq!(exec.stats().tracked, 0);
        for fut in futures {
            exec.destroy(fut);
        }
    }

    #[test]
    fn test_run_loop_dispatch_keeps_callbacks_on_caller() {
        let exec = Executor::new(
            config(2, 16).continuation_dispatch(ContinuationDispatch::RunLoop),
        )
        .unwrap();
        exec.start().unwrap();

        let caller = thread::current().id();
        let on_caller = Arc::new(AtomicUsize::new(0));
        for n in 0..10 {
            let c = Arc::clone(&on_caller);
            exec.submit_then(times_42, &n, move |_| {
                if thread::current().id() == caller {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
        }

        let stats = exec.run_loop();
        // Continuations registered after completion fire on the caller too,
        // so every one of them ran on this thread.
        assert_eq!(on_caller.load(Ordering::SeqCst), 10);
        assert!(stats.fired <= 10);
    }

    #[test]
    fn test_independent_executors() {
        let a = Executor::new(config(1, 2)).unwrap();
        let b = Executor::new(config(1, 2)).unwrap();

        a.submit(times_42, &1).unwrap();
        a.submit(times_42, &2).unwrap();
        assert!(a.submit(times_42, &3).is_err());
        assert!(b.submit(times_42, &3).is_ok());
    }
}
