//! Time sources for stamping operation completions.
//!
//! Ledger windows measure how long ago *this process* learned that an
//! operation succeeded, so every completion is stamped by the engine's clock
//! at delivery time. Collaborators never supply completion timestamps.

use crate::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// A source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch system time is a misconfigured host; clamp to zero.
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// A manually driven clock.
///
/// Useful for deterministic tests and for replaying recorded event streams.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Set the current reading.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward by `millis` and return the new reading.
    pub fn advance(&self, millis: u64) -> Timestamp {
        self.now.fetch_add(millis, Ordering::SeqCst) + millis
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn manual_clock_starts_where_told() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
    }

    #[test]
    fn manual_clock_set_and_advance() {
        let clock = ManualClock::new(0);
        clock.set(50);
        assert_eq!(clock.now(), 50);
        assert_eq!(clock.advance(25), 75);
        assert_eq!(clock.now(), 75);
    }

    #[test]
    fn shared_clock_reads_through_arc() {
        let clock = Arc::new(ManualClock::new(10));
        let shared: Arc<ManualClock> = Arc::clone(&clock);
        clock.advance(5);
        assert_eq!(Clock::now(&shared), 15);
    }

    #[test]
    fn system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800_000);
    }
}
