//! Continuation registry and cooperative run loop
//!
//! Futures that get a continuation while still pending are tracked here.
//! `run()` blocks the calling thread until every tracked continuation has
//! fired and returned.
//!
//! Completions arrive from any worker thread and unpark the loop. With
//! `ContinuationDispatch::RunLoop` the worker also pushes the completed
//! future onto a lock-free notification queue for the loop to fire. The
//! loop rescans the tracked list on every pass, and falls back to waking
//! after `poll_interval` if nothing unparks it.
//!
//! Lock order: registry list, then future. Futures never touch the list
//! while holding their own lock.

use crate::parking::{new_parking, Parking};
use taskpool_core::{kdebug, ktrace};
use taskpool_core::FutureId;

use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Who runs a continuation that was registered before completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContinuationDispatch {
    /// The worker that completes the future runs it
    #[default]
    Inline,
    /// The thread inside `Registry::run()` runs it
    RunLoop,
}

/// Type-erased view of a future, as seen by the registry
pub trait Tracked: Send + Sync {
    fn id(&self) -> FutureId;

    /// Continuation fired and has returned
    fn is_settled(&self) -> bool;

    /// Fire the continuation if completed and not yet fired.
    /// Returns `true` if this call ran it.
    fn try_fire(&self) -> bool;
}

/// Outcome of one `run()` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Scan passes performed
    pub passes: u64,
    /// Continuations fired on the run loop thread
    pub fired: u64,
}

pub struct Registry {
    tracked: Mutex<Vec<Arc<dyn Tracked>>>,
    completions: SegQueue<Arc<dyn Tracked>>,
    parking: Box<dyn Parking>,
    poll_interval: Duration,
    dispatch: ContinuationDispatch,
    total_tracked: AtomicU64,
}

impl Registry {
    pub fn new(poll_interval: Duration, dispatch: ContinuationDispatch) -> Self {
        Self {
            tracked: Mutex::new(Vec::new()),
            completions: SegQueue::new(),
            parking: new_parking(),
            poll_interval,
            dispatch,
            total_tracked: AtomicU64::new(0),
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Tracked>>> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn dispatch(&self) -> ContinuationDispatch {
        self.dispatch
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Start tracking a future whose continuation is pending
    pub fn track(&self, future: Arc<dyn Tracked>) {
        ktrace!("registry tracking {}", future.id());
        self.lock().push(future);
        self.total_tracked.fetch_add(1, Ordering::Relaxed);
        // A run loop parked on an empty list must see the new entry.
        self.parking.unpark();
    }

    /// Hand a completed future with a deferred continuation to the loop
    pub fn notify_completed(&self, future: Arc<dyn Tracked>) {
        self.completions.push(future);
        self.parking.unpark();
    }

    /// Wake the loop so it rescans; the continuation already fired
    #[inline]
    pub fn wake(&self) {
        self.parking.unpark();
    }

    /// Completed futures queued for the loop and not yet drained
    pub fn queued_notifications(&self) -> usize {
        self.completions.len()
    }

    /// Futures still waiting for their continuation to fire
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Futures ever tracked by this registry
    pub fn total_tracked(&self) -> u64 {
        self.total_tracked.load(Ordering::Relaxed)
    }

    /// Drop every tracked future and pending notification
    ///
    /// Breaks the future/registry reference cycle when the owner goes away
    /// without a final `run()`. Returns how many continuations never fired.
    pub fn release(&self) -> usize {
        while self.completions.pop().is_some() {}
        let mut tracked = self.lock();
        let unfired = tracked.iter().filter(|f| !f.is_settled()).count();
        tracked.clear();
        if unfired > 0 {
            kdebug!("registry released with {} unfired continuations", unfired);
        }
        unfired
    }

    /// Block until every tracked continuation has fired
    ///
    /// Runs continuations deferred to the loop (`ContinuationDispatch::RunLoop`)
    /// and any completed-but-unfired continuation left by a race. Returns
    /// immediately if nothing is tracked. Futures that never complete keep
    /// this loop alive; there is no timeout.
    pub fn run(&self) -> RunStats {
        let mut stats = RunStats::default();

        loop {
            stats.passes += 1;

            while let Some(future) = self.completions.pop() {
                if future.try_fire() {
                    stats.fired += 1;
                }
            }

            let snapshot: Vec<Arc<dyn Tracked>> = self.lock().clone();
            for future in &snapshot {
                if future.try_fire() {
                    stats.fired += 1;
                }
            }
            drop(snapshot);

            let remaining = {
                let mut tracked = self.lock();
                tracked.retain(|f| !f.is_settled());
                tracked.len()
            };
            if remaining == 0 {
                break;
            }

            ktrace!("run loop pass {}: {} pending", stats.passes, remaining);
            self.parking.park(Some(self.poll_interval));
        }

        kdebug!(
            "run loop done after {} passes, {} fired on loop thread",
            stats.passes,
            stats.fired
        );
        stats
    }
}
