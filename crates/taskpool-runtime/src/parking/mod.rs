//! Run loop parking
//!
//! The run loop sleeps here between passes. Workers that complete a
//! tracked future call `unpark()`, so the loop reacts to completions
//! immediately instead of waiting out its poll interval.
//!
//! A wake issued while nobody is parked is remembered: the next `park()`
//! returns at once. This closes the window between the loop's last scan
//! and its next sleep.

use std::time::Duration;

/// Sleep/wake primitive for a single coordinating thread
pub trait Parking: Send + Sync {
    /// Park until unparked or `timeout` elapses
    ///
    /// Returns `true` if a wake was consumed, `false` on timeout or
    /// spurious return. Callers re-check their condition either way.
    fn park(&self, timeout: Option<Duration>) -> bool;

    /// Wake the parked thread, or make the next `park()` return at once
    fn unpark(&self);
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexParking as PlatformParking;
    } else {
        mod fallback;
        pub use fallback::CondvarParking as PlatformParking;
    }
}

/// Create a new platform-appropriate parking instance
pub fn new_parking() -> Box<dyn Parking> {
    Box::new(PlatformParking::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_park_timeout() {
        let parking = new_parking();
        let start = Instant::now();
        let woken = parking.park(Some(Duration::from_millis(50)));
        let elapsed = start.elapsed();

        assert!(!woken);
        assert!(elapsed >= Duration::from_millis(40));
    }

    #[test]
    fn test_unpark_before_park_is_remembered() {
        let parking = new_parking();
        parking.unpark();

        let start = Instant::now();
        assert!(parking.park(Some(Duration::from_secs(5))));
        assert!(start.elapsed() < Duration::from_secs(1));

        // The wake was consumed; the next park times out.
        assert!(!parking.park(Some(Duration::from_millis(10))));
    }

    #[test]
    fn test_unpark_wakes_parked_thread() {
        let parking = Arc::new(PlatformParking::new());
        let parking2 = Arc::clone(&parking);

        let handle = thread::spawn(move || {
            let start = Instant::now();
            parking2.park(Some(Duration::from_secs(10)));
            start.elapsed()
        });

        thread::sleep(Duration::from_millis(50));
        parking.unpark();

        let elapsed = handle.join().unwrap();
        assert!(elapsed < Duration::from_secs(5));
    }
}
