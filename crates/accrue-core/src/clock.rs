//! Time sources for the ledger.
//!
//! [`SystemClock`] reads wall-clock Unix seconds. [`ManualClock`] is set
//! explicitly and is used by tests and by the CLI when replaying at a fixed
//! instant.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::traits::Clock;

/// Wall-clock time in Unix seconds.
///
/// Readings before the Unix epoch clamp to zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Never moves backwards: [`set`](ManualClock::set) to an earlier time is
/// ignored.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move the clock to `to` if that is not earlier than the current reading.
    pub fn set(&self, to: u64) {
        self.now.fetch_max(to, Ordering::SeqCst);
    }

    /// Advance the clock by `secs`, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(secs))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
