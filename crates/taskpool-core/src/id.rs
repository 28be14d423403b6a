//! Future identifier type

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a future (and of the job that completes it)
///
/// Ids are process-unique and monotonically increasing. They exist for
/// diagnostics only; nothing is looked up by id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FutureId(u64);

impl FutureId {
    /// Allocate a fresh id
    #[inline]
    pub fn next() -> Self {
        FutureId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FutureId({})", self.0)
    }
}

impl fmt::Display for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fut-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_is_unique_and_increasing() {
        let a = FutureId::next();
        let b = FutureId::next();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_formatting() {
        let id = FutureId::next();
        assert_eq!(format!("{}", id), format!("fut-{}", id.0));
        assert_eq!(format!("{:?}", id), format!("FutureId({})", id.0));
    }
}
