//! Executor configuration
//!
//! Library defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env()` only)
//! 3. Library defaults (`defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use taskpool_runtime::config::PoolConfig;
//!
//! let config = PoolConfig::from_env()
//!     .num_workers(4)
//!     .queue_capacity(64);
//! ```

pub mod defaults;

use crate::registry::ContinuationDispatch;
use taskpool_core::constants::{MAX_QUEUE_CAPACITY, MAX_WORKERS};
use taskpool_core::env::{env_get, env_get_bool, env_get_ms, env_get_str};
use taskpool_core::ConfigError;

use std::time::Duration;

/// Executor configuration with builder pattern
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads
    pub num_workers: usize,
    /// Jobs that can wait in the queue before submissions overflow
    pub queue_capacity: usize,
    /// Longest the run loop sleeps without a completion wake
    pub poll_interval: Duration,
    /// Who fires continuations registered before completion
    pub continuation_dispatch: ContinuationDispatch,
    /// Worker thread name prefix
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `TP_NUM_WORKERS` - Number of worker threads
    /// - `TP_QUEUE_CAPACITY` - Job queue capacity
    /// - `TP_POLL_INTERVAL_MS` - Run loop fallback interval
    /// - `TP_RUN_LOOP_DISPATCH` - Fire continuations on the run loop (0/1)
    /// - `TP_THREAD_NAME_PREFIX` - Worker thread name prefix
    pub fn from_env() -> Self {
        let run_loop = env_get_bool("TP_RUN_LOOP_DISPATCH", defaults::RUN_LOOP_DISPATCH);
        Self {
            num_workers: env_get("TP_NUM_WORKERS", defaults::num_workers()),
            queue_capacity: env_get("TP_QUEUE_CAPACITY", defaults::QUEUE_CAPACITY),
            poll_interval: env_get_ms("TP_POLL_INTERVAL_MS", defaults::POLL_INTERVAL_MS),
            continuation_dispatch: dispatch_for(run_loop),
            thread_name_prefix: env_get_str("TP_THREAD_NAME_PREFIX", defaults::THREAD_NAME_PREFIX),
        }
    }

    /// Library defaults only, ignoring the environment.
    /// Useful for tests.
    pub fn new() -> Self {
        Self {
            num_workers: defaults::num_workers(),
            queue_capacity: defaults::QUEUE_CAPACITY,
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            continuation_dispatch: dispatch_for(defaults::RUN_LOOP_DISPATCH),
            thread_name_prefix: defaults::THREAD_NAME_PREFIX.to_string(),
        }
    }

    // Builder methods

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn queue_capacity(mut self, cap: usize) -> Self {
        self.queue_capacity = cap;
        self
    }

    pub fn poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }

    pub fn continuation_dispatch(mut self, dispatch: ContinuationDispatch) -> Self {
        self.continuation_dispatch = dispatch;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::InvalidValue("num_workers must be > 0"));
        }
        if self.num_workers > MAX_WORKERS {
            return Err(ConfigError::InvalidValue("num_workers must be <= 256"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("queue_capacity must be > 0"));
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::InvalidValue("queue_capacity must be <= 1048576"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue("poll_interval must be > 0"));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("taskpool configuration:");
        eprintln!("  num_workers:            {}", self.num_workers);
        eprintln!("  queue_capacity:         {}", self.queue_capacity);
        eprintln!("  poll_interval:          {:?}", self.poll_interval);
        eprintln!("  continuation_dispatch:  {:?}", self.continuation_dispatch);
        eprintln!("  thread_name_prefix:     {}", self.thread_name_prefix);
    }
}

fn dispatch_for(run_loop: bool) -> ContinuationDispatch {
    if run_loop {
        ContinuationDispatch::RunLoop
    } else {
        ContinuationDispatch::Inline
    }
}
