//! # taskpool - In-process task executor
//!
//! Submit work to a fixed pool of worker threads, get back a future, and
//! either block on it, poll it, or attach a one-shot continuation that a
//! cooperative run loop waits for.
//!
//! ## Quick Start
//!
//! ```ignore
//! use taskpool::{Executor, kinfo};
//!
//! fn times_42(n: i32) -> i32 { n * 42 }
//!
//! fn main() -> taskpool::ExecResult<()> {
//!     let exec = Executor::init(Some(4))?;
//!
//!     let fut = exec.submit(times_42, &5)?;
//!     exec.then(&fut, |v| kinfo!("result: {}", v));
//!
//!     exec.run_loop();
//!     exec.shutdown();
//!     exec.join()
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   submit()/spawn()            then()
//!        │                        │
//!        ▼                        ▼
//! ┌──────────────┐        ┌──────────────┐       ┌──────────────┐
//! │ Bounded Job  │        │  TaskFuture  │──────▶│   Registry   │
//! │    Queue     │        │ result + cb  │ track │  (run loop)  │
//! └──────────────┘        └──────────────┘       └──────────────┘
//!        │                        ▲                      ▲
//!        ▼                        │ complete()           │ notify
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Worker threads (fixed pool)                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Environment Variables
//!
//! - `TP_NUM_WORKERS`, `TP_QUEUE_CAPACITY`, `TP_POLL_INTERVAL_MS`,
//!   `TP_RUN_LOOP_DISPATCH`, `TP_THREAD_NAME_PREFIX` - see `PoolConfig`
//! - `TP_LOG_LEVEL` - off, error, warn, info, debug, trace
//! - `TP_FLUSH_EPRINT=1` - flush log output immediately
//! - `TP_LOG_TIME=1` - prefix log lines with a timestamp

// Re-export core types
pub use taskpool_core::{
    ContinuationState,
    FutureId,
    FutureState,
    TaskStage,
    ThenOutcome,
    ConfigError,
    ExecError,
    ExecResult,
    WorkerError,
};

// Re-export kprint macros for debug logging
pub use taskpool_core::{kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use taskpool_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled, set_time_enabled};

// Re-export env utilities
pub use taskpool_core::{env_get, env_get_bool, env_get_ms, env_get_opt, env_get_str, env_is_set};

// Re-export runtime types
pub use taskpool_runtime::{
    ContinuationDispatch,
    Executor,
    ExecutorStats,
    PolledTask,
    PoolConfig,
    Progress,
    RunStats,
    TaskFuture,
    current_worker_id,
};

/// Run `f` against a started executor, then drain it
///
/// After `f` returns, the run loop fires every pending continuation, the
/// executor is shut down and its workers are joined.
///
/// ```ignore
/// let total = taskpool::block_on(PoolConfig::new().num_workers(2), |exec| {
///     exec.submit(|n: u32| n + 1, &1).map(|f| *f.get())
/// })?;
/// ```
pub fn block_on<F, T>(config: PoolConfig, f: F) -> ExecResult<T>
where
    F: FnOnce(&Executor) -> T,
{
    let exec = Executor::new(config)?;
    exec.start()?;

    let result = f(&exec);
    let stats = exec.run_loop();
    kdebug!("block_on: run loop done after {} passes", stats.passes);

    exec.shutdown();
    exec.join()?;
    Ok(result)
}
