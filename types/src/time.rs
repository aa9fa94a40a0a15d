//! Timestamp type and the clock abstraction used throughout the engine.
//!
//! Timestamps are Unix epoch milliseconds (UTC). Cooldowns and lockouts are
//! measured on the clock's monotonic reading instead, so wall-clock jumps
//! cannot shorten them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: u64 = 86_400_000;

/// A Unix timestamp in milliseconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A clock set before 1970 reads as the epoch.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(millis as u64)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// This timestamp shifted forward by `millis`.
    pub fn plus_millis(&self, millis: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(millis))
    }

    /// This timestamp shifted forward by whole days.
    pub fn plus_days(&self, days: u64) -> Timestamp {
        self.plus_millis(days.saturating_mul(MILLIS_PER_DAY))
    }

    /// Whether this timestamp + duration has passed relative to `now`.
    pub fn has_expired(&self, duration_millis: u64, now: Timestamp) -> bool {
        now.0 >= self.0.saturating_add(duration_millis)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of wall-clock and monotonic time.
///
/// Services receive a clock instead of calling `SystemTime` directly so tests
/// can drive expiry and cooldown deterministically.
pub trait Clock: Send + Sync {
    /// Wall-clock time, used for record timestamps.
    fn now(&self) -> Timestamp;

    /// Monotonic time since an arbitrary fixed origin, used for cooldowns.
    fn monotonic(&self) -> Duration;
}

/// The production clock.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }
}
