//! Error types for the taskpool executor

use core::fmt;

/// Result type for executor operations
pub type ExecResult<T> = Result<T, ExecError>;

/// Errors surfaced by the executor
///
/// Nothing here is retried internally. The caller decides whether to
/// resubmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Job queue was full at submission; the job was dropped
    QueueFull,

    /// Copying the caller's argument failed (bytes requested)
    AllocationFailed(usize),

    /// Caller-supplied argument is inconsistent
    InvalidArgument(&'static str),

    /// Executor has been shut down; no new work is accepted
    ShutDown,

    /// Workers were already started
    AlreadyStarted,

    /// Operation needs running workers
    NotStarted,

    /// Configuration rejected by validation
    Config(ConfigError),

    /// Worker thread error
    Worker(WorkerError),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::QueueFull => write!(f, "job queue full, job dropped"),
            ExecError::AllocationFailed(n) => {
                write!(f, "failed to allocate {} bytes for job argument", n)
            }
            ExecError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            ExecError::ShutDown => write!(f, "executor shut down"),
            ExecError::AlreadyStarted => write!(f, "executor already started"),
            ExecError::NotStarted => write!(f, "executor not started"),
            ExecError::Config(e) => write!(f, "config error: {}", e),
            ExecError::Worker(e) => write!(f, "worker error: {}", e),
        }
    }
}

impl std::error::Error for ExecError {}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for ExecError {
    fn from(e: ConfigError) -> Self {
        ExecError::Config(e)
    }
}

/// Worker thread related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Failed to spawn worker thread
    SpawnFailed,

    /// Worker thread panicked outside of a job
    Panicked,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::SpawnFailed => write!(f, "failed to spawn worker thread"),
            WorkerError::Panicked => write!(f, "worker thread panicked"),
        }
    }
}

impl std::error::Error for WorkerError {}

impl From<WorkerError> for ExecError {
    fn from(e: WorkerError) -> Self {
        ExecError::Worker(e)
    }
}
