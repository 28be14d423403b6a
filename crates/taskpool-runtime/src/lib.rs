//! # taskpool-runtime
//!
//! Thread-backed runtime for the taskpool executor.
//!
//! This crate provides:
//! - Bounded FIFO job queue with explicit overflow
//! - Fixed worker thread pool
//! - Single-assignment futures with one-shot continuations
//! - Continuation registry and the cooperative run loop
//! - Run loop parking (futex on Linux, condvar elsewhere)
//! - Step-polled tasks

pub mod config;
pub mod queue;
pub mod parking;
pub mod future;
pub mod job;
pub mod registry;
pub mod worker;
pub mod executor;
pub mod polled;

// Re-exports
pub use config::PoolConfig;
pub use queue::{BoundedQueue, QueueError};
pub use future::{Continuation, TaskFuture};
pub use job::{ClosureJob, Execute, FnJob};
pub use registry::{ContinuationDispatch, Registry, RunStats};
pub use worker::{current_worker_id, JobQueue, WorkerPool};
pub use executor::{Executor, ExecutorStats};
pub use polled::{PolledTask, Progress};
pub use parking::{new_parking, Parking};
