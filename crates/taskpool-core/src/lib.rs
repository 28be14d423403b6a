//! # taskpool-core
//!
//! Core types shared by the taskpool executor crates.
//!
//! This crate holds no threads and no synchronization of its own. The
//! queue, futures, worker pool and run loop live in `taskpool-runtime`.
//!
//! ## Modules
//!
//! - `id` - Future/job identifier type
//! - `state` - Future, continuation and polled-task state enums
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::FutureId;
pub use state::{ContinuationState, FutureState, TaskStage, ThenOutcome};
pub use error::{ConfigError, ExecError, ExecResult, WorkerError};
pub use env::{env_get, env_get_bool, env_get_ms, env_get_opt, env_get_str, env_is_set};

/// Sizing constants
pub mod constants {
    /// Maximum worker threads per executor
    pub const MAX_WORKERS: usize = 256;

    /// Largest usable job queue capacity
    pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

    /// Default usable job queue capacity (a ring of 512 slots)
    pub const DEFAULT_QUEUE_CAPACITY: usize = 511;

    /// Worker count used when the host cannot report its parallelism
    pub const FALLBACK_WORKERS: usize = 2;
}
