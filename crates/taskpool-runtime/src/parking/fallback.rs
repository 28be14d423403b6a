//! Condvar-based run loop parking for platforms without futex

use super::Parking;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

pub struct CondvarParking {
    /// true = wake pending
    pending: Mutex<bool>,
    condvar: Condvar,
}

impl CondvarParking {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }
}

impl Default for CondvarParking {
    fn default() -> Self {
        Self::new()
    }
}

impl Parking for CondvarParking {
    fn park(&self, timeout: Option<Duration>) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !*pending {
            pending = match timeout {
                Some(t) => {
                    self.condvar
                        .wait_timeout(pending, t)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self.condvar.wait(pending).unwrap_or_else(PoisonError::into_inner),
            };
        }
        std::mem::replace(&mut *pending, false)
    }

    fn unpark(&self) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.condvar.notify_all();
    }
}
