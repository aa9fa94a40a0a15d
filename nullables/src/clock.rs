//! Nullable clock: deterministic time for testing.

use faceguard_types::{Clock, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to. Wall-clock and monotonic readings
/// move together; `set` moves only the wall clock, the way an NTP step would.
pub struct NullClock {
    wall_millis: AtomicU64,
    monotonic_millis: AtomicU64,
}

impl NullClock {
    pub fn new(initial_millis: u64) -> Self {
        Self {
            wall_millis: AtomicU64::new(initial_millis),
            monotonic_millis: AtomicU64::new(0),
        }
    }

    /// Advance both clocks by a number of milliseconds.
    pub fn advance(&self, millis: u64) {
        self.wall_millis.fetch_add(millis, Ordering::SeqCst);
        self.monotonic_millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Advance by whole days.
    pub fn advance_days(&self, days: u64) {
        self.advance(days * faceguard_types::time::MILLIS_PER_DAY);
    }

    /// Set the wall clock to a specific value.
    pub fn set(&self, millis: u64) {
        self.wall_millis.store(millis, Ordering::SeqCst);
    }
}

impl Default for NullClock {
    fn default() -> Self {
        Self::new(1_700_000_000_000)
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.wall_millis.load(Ordering::SeqCst))
    }

    fn monotonic(&self) -> Duration {
        Duration::from_millis(self.monotonic_millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_both_readings() {
        let clock = NullClock::new(1_000);
        clock.advance(250);
        assert_eq!(clock.now(), Timestamp::new(1_250));
        assert_eq!(clock.monotonic(), Duration::from_millis(250));
    }

    #[test]
    fn wall_clock_jump_leaves_monotonic_alone() {
        let clock = NullClock::new(1_000);
        clock.set(0);
        assert_eq!(clock.now(), Timestamp::new(0));
        assert_eq!(clock.monotonic(), Duration::ZERO);
    }
}
