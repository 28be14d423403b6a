//! Compile-time defaults for `PoolConfig`

use taskpool_core::constants::{DEFAULT_QUEUE_CAPACITY, FALLBACK_WORKERS, MAX_WORKERS};

/// Usable job queue slots
pub const QUEUE_CAPACITY: usize = DEFAULT_QUEUE_CAPACITY;

/// Run loop fallback wake interval
pub const POLL_INTERVAL_MS: u64 = 1;

/// Continuations fire on the completing worker unless set
pub const RUN_LOOP_DISPATCH: bool = false;

/// Worker thread names are `{prefix}-{index}`
pub const THREAD_NAME_PREFIX: &str = "taskpool-worker";

/// Worker count: host parallelism, clamped to `MAX_WORKERS`
pub fn num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKERS)
        .min(MAX_WORKERS)
}
