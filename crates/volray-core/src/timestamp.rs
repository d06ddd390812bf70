//! Monotonic modification time stamps.
//!
//! Every data object and every GPU mirror records its last change as a
//! [`TimeStamp`] drawn from one process-wide counter, so stamps taken by
//! unrelated objects can be compared directly. This is what the dirty checks
//! rely on: a GPU resource is stale when its source was modified after the
//! resource was built.

use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL_CLOCK: AtomicU64 = AtomicU64::new(0);

/// A point on the process-wide modification clock.
///
/// The default stamp (`0`) is older than any stamp produced by
/// [`TimeStamp::modified`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeStamp(u64);

impl TimeStamp {
    /// A stamp that predates every modification.
    pub const NEVER: TimeStamp = TimeStamp(0);

    /// Returns a fresh stamp, newer than every stamp handed out before.
    #[must_use]
    pub fn now() -> Self {
        Self(GLOBAL_CLOCK.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Advances this stamp to the current clock value.
    pub fn modified(&mut self) {
        *self = Self::now();
    }

    /// Returns the raw clock value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    /// Returns true if this stamp has never been advanced.
    #[must_use]
    pub fn is_never(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamps_are_monotonic() {
        let a = TimeStamp::now();
        let b = TimeStamp::now();
        assert!(b > a);

        let mut c = TimeStamp::default();
        assert!(c.is_never());
        c.modified();
        assert!(c > b);
        assert!(c > TimeStamp::NEVER);
    }
}
