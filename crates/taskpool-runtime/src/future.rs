//! Single-assignment futures with a one-shot continuation
//!
//! A `TaskFuture<T>` is a cloneable handle. The submitter holds one, the
//! job that completes it holds another, and the continuation registry may
//! hold a third while a continuation is pending. The shared cell lives
//! until the last handle is dropped, so `destroy()` racing with a worker's
//! `complete()` cannot free memory under it.
//!
//! # Exactly-once continuation
//!
//! The continuation is claimed under the future's lock by flipping
//! `ContinuationState` to `Fired`; whoever flips it (the completing worker,
//! the registering thread or the run loop) runs the callback, with the lock
//! released. Everyone else sees `Fired` and backs off.

use crate::registry::{ContinuationDispatch, Registry, Tracked};
use taskpool_core::{ktrace, kdebug};
use taskpool_core::{ContinuationState, FutureId, FutureState, ThenOutcome};

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Boxed continuation; its captures are the callback context
pub type Continuation<T> = Box<dyn FnOnce(Arc<T>) + Send + 'static>;

struct Slot<T> {
    state: FutureState,
    result: Option<Arc<T>>,
    continuation: Option<Continuation<T>>,
    cont_state: ContinuationState,
    /// Fired continuation has returned (or unwound)
    settled: bool,
    /// Registered with a registry while pending
    tracked: bool,
}

struct Shared<T> {
    id: FutureId,
    slot: Mutex<Slot<T>>,
    cond: Condvar,
    registry: Option<Arc<Registry>>,
}

/// Handle to a result that will be produced by a worker
pub struct TaskFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.lock();
        f.debug_struct("TaskFuture")
            .field("id", &self.shared.id)
            .field("state", &slot.state)
            .field("continuation", &slot.cont_state)
            .finish()
    }
}

impl<T> Shared<T> {
    #[inline]
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a claimed continuation, marking it settled even if it unwinds
    fn run_continuation(&self, cb: Continuation<T>, value: Arc<T>) {
        struct Settle<'a, T>(&'a Shared<T>);
        impl<T> Drop for Settle<'_, T> {
            fn drop(&mut self) {
                self.0.lock().settled = true;
            }
        }

        let _settle = Settle(self);
        ktrace!("{} firing continuation", self.id);
        cb(value);
    }
}

impl<T: Send + Sync + 'static> Tracked for Shared<T> {
    fn id(&self) -> FutureId {
        self.id
    }

    fn is_settled(&self) -> bool {
        let slot = self.lock();
        slot.cont_state.is_fired() && slot.settled
    }

    fn try_fire(&self) -> bool {
        let claimed = {
            let mut slot = self.lock();
            if !slot.state.is_completed() || slot.cont_state != ContinuationState::Registered {
                None
            } else {
                slot.cont_state = ContinuationState::Fired;
                slot.continuation.take().zip(slot.result.clone())
            }
        };
        match claimed {
            Some((cb, value)) => {
                self.run_continuation(cb, value);
                true
            }
            None => false,
        }
    }
}

impl<T: Send + Sync + 'static> TaskFuture<T> {
    /// Create a pending future not attached to any registry
    ///
    /// Continuations registered on it fire on the completing thread.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a pending future whose pending continuations are tracked by
    /// `registry`
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self::build(Some(registry))
    }

    fn build(registry: Option<Arc<Registry>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: FutureId::next(),
                slot: Mutex::new(Slot {
                    state: FutureState::Pending,
                    result: None,
                    continuation: None,
                    cont_state: ContinuationState::Unregistered,
                    settled: false,
                    tracked: false,
                }),
                cond: Condvar::new(),
                registry,
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> FutureId {
        self.shared.id
    }

    /// Store the result and wake waiters
    ///
    /// Called once, by the worker that ran the job. A registered continuation
    /// fires here after the lock is released, unless the registry dispatches
    /// continuations from its run loop. Returns `false` (dropping `value`)
    /// if the future was already completed.
    pub fn complete(&self, value: T) -> bool {
        let shared = &self.shared;
        let value = Arc::new(value);

        let (claimed, tracked, deferred) = {
            let mut slot = shared.lock();
            if slot.state.is_completed() {
                kdebug!("{} completed twice, second result dropped", shared.id);
                return false;
            }
            slot.result = Some(Arc::clone(&value));
            slot.state = FutureState::Completed;
            shared.cond.notify_all();

            let deferred = slot.tracked
                && shared
                    .registry
                    .as_ref()
                    .is_some_and(|r| r.dispatch() == ContinuationDispatch::RunLoop);

            let claimed = if slot.cont_state == ContinuationState::Registered && !deferred {
                slot.cont_state = ContinuationState::Fired;
                slot.continuation.take()
            } else {
                None
            };
            (claimed, slot.tracked, deferred)
        };

        ktrace!("{} completed", shared.id);

        if let Some(cb) = claimed {
            shared.run_continuation(cb, value);
        }

        if let Some(registry) = shared.registry.as_ref().filter(|_| tracked) {
            if deferred {
                registry.notify_completed(Arc::clone(shared) as Arc<dyn Tracked>);
            } else {
                registry.wake();
            }
        }
        true
    }

    /// Non-blocking completion check
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.shared.lock().state.is_completed()
    }

    pub fn state(&self) -> FutureState {
        self.shared.lock().state
    }

    pub fn continuation_state(&self) -> ContinuationState {
        self.shared.lock().cont_state
    }

    /// Block until completed and return the shared result
    ///
    /// Any number of threads may wait; all receive the same `Arc`.
    pub fn get(&self) -> Arc<T> {
        let mut slot = self.shared.lock();
        loop {
            if let Some(result) = &slot.result {
                return Arc::clone(result);
            }
            slot = self
                .shared
                .cond
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// The result if already completed, without blocking
    pub fn try_get(&self) -> Option<Arc<T>> {
        self.shared.lock().result.clone()
    }

    /// Register a one-shot continuation
    ///
    /// - completed, nothing fired yet: `f` runs now on this thread
    /// - pending, nothing registered: `f` is stored and the future is
    ///   tracked by its registry (if any)
    /// - otherwise `f` is dropped without running
    pub fn then<F>(&self, f: F) -> ThenOutcome
    where
        F: FnOnce(Arc<T>) + Send + 'static,
    {
        let shared = &self.shared;
        let mut slot = shared.lock();

        if slot.state.is_completed() {
            return match slot.cont_state {
                ContinuationState::Unregistered => {
                    slot.cont_state = ContinuationState::Fired;
                    let value = slot.result.clone();
                    drop(slot);
                    if let Some(value) = value {
                        shared.run_continuation(Box::new(f), value);
                    }
                    ThenOutcome::FiredInline
                }
                ContinuationState::Registered => {
                    // Completed with a continuation the run loop has not
                    // fired yet; that one keeps its turn.
                    ThenOutcome::AlreadyRegistered
                }
                ContinuationState::Fired => ThenOutcome::AlreadyFired,
            };
        }

        match slot.cont_state {
            ContinuationState::Unregistered => {
                slot.continuation = Some(Box::new(f));
                slot.cont_state = ContinuationState::Registered;
                slot.tracked = shared.registry.is_some();
                drop(slot);

                if let Some(registry) = &shared.registry {
                    registry.track(Arc::clone(shared) as Arc<dyn Tracked>);
                }
                kdebug!("{} continuation registered", shared.id);
                ThenOutcome::Registered
            }
            ContinuationState::Registered => ThenOutcome::AlreadyRegistered,
            ContinuationState::Fired => ThenOutcome::AlreadyFired,
        }
    }

    /// Release this handle
    ///
    /// Call once the result has been consumed. The shared cell is freed
    /// when the job and registry have let go of it too.
    pub fn destroy(self) {
        ktrace!("{} handle destroyed", self.shared.id);
        drop(self);
    }
}

impl<T: Send + Sync + 'static> Default for TaskFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}
