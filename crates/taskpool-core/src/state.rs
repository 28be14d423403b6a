//! Future, continuation and polled-task state types

use core::fmt;

/// Completion state of a future
///
/// `Pending -> Completed` is the only transition and happens at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureState {
    /// Job not yet executed (or still executing)
    Pending,

    /// Result stored; terminal
    Completed,
}

impl FutureState {
    #[inline]
    pub const fn is_completed(&self) -> bool {
        matches!(self, FutureState::Completed)
    }
}

/// Continuation state of a future, orthogonal to `FutureState`
///
/// ```text
/// Unregistered --then()--> Registered --complete()/run loop--> Fired
/// Unregistered --then() after complete()-------------------> Fired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationState {
    /// No continuation has been registered
    Unregistered,

    /// A continuation is stored and waits for completion
    Registered,

    /// The continuation has run (or is running); terminal
    Fired,
}

impl ContinuationState {
    #[inline]
    pub const fn is_fired(&self) -> bool {
        matches!(self, ContinuationState::Fired)
    }
}

/// What a call to `then()` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThenOutcome {
    /// The future was already complete; the continuation ran on the caller
    FiredInline,

    /// The future is pending; the continuation was stored
    Registered,

    /// Another continuation is already stored; this one was dropped
    AlreadyRegistered,

    /// The continuation already fired; this one was dropped
    AlreadyFired,
}

impl ThenOutcome {
    /// True if this call's continuation will run (or has run)
    #[inline]
    pub const fn accepted(&self) -> bool {
        matches!(self, ThenOutcome::FiredInline | ThenOutcome::Registered)
    }
}

/// Stage of a step-polled task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    /// Nothing submitted yet
    NotStarted,

    /// Job submitted, not yet observed as running or finished
    Submitted,

    /// Polled at least once after submission; result not ready
    Waiting,

    /// Result delivered (or submission failed); terminal
    Done,
}

impl TaskStage {
    #[inline]
    pub const fn is_done(&self) -> bool {
        matches!(self, TaskStage::Done)
    }
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStage::NotStarted => write!(f, "not started"),
            TaskStage::Submitted => write!(f, "submitted"),
            TaskStage::Waiting => write!(f, "waiting"),
            TaskStage::Done => write!(f, "done"),
        }
    }
}
