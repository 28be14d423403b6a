//! Linux futex-based run loop parking
//!
//! Futex word: 0 = no wake pending, 1 = wake pending.
//!
//! `unpark()` always sets the word before issuing FUTEX_WAKE, and `park()`
//! waits only while the word is still 0, so a wake racing with the start
//! of `park()` makes FUTEX_WAIT return EAGAIN instead of being lost.

use super::Parking;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

pub struct FutexParking {
    futex: AtomicU32,
    parked: AtomicUsize,
}

impl FutexParking {
    pub fn new() -> Self {
        Self {
            futex: AtomicU32::new(0),
            parked: AtomicUsize::new(0),
        }
    }
}

impl Default for FutexParking {
    fn default() -> Self {
        Self::new()
    }
}

impl Parking for FutexParking {
    fn park(&self, timeout: Option<Duration>) -> bool {
        if self.futex.swap(0, Ordering::AcqRel) != 0 {
            return true;
        }

        self.parked.fetch_add(1, Ordering::SeqCst);

        let timespec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs() as libc::time_t,
            tv_nsec: d.subsec_nanos() as libc::c_long,
        });
        let timespec_ptr = match &timespec {
            Some(ts) => ts as *const libc::timespec,
            None => std::ptr::null(),
        };

        // Safety: the futex word lives as long as `self`; the timeout
        // pointer is either null or points at a live stack value.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                0u32,
                timespec_ptr,
                std::ptr::null::<u32>(),
                0u32,
            );
        }

        self.parked.fetch_sub(1, Ordering::SeqCst);

        // Whatever woke us (FUTEX_WAKE, EAGAIN, timeout, EINTR), the word
        // tells whether a wake is pending.
        self.futex.swap(0, Ordering::AcqRel) != 0
    }

    fn unpark(&self) {
        self.futex.store(1, Ordering::SeqCst);

        if self.parked.load(Ordering::SeqCst) == 0 {
            return;
        }

        // Safety: plain FUTEX_WAKE on a word owned by `self`.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                i32::MAX,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }
}
