//! Nanosecond-precision wall-clock timestamp.
//!
//! Expiration deadlines are stored as absolute nanoseconds since the Unix
//! epoch so that SNAP files remain meaningful across process restarts.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Absolute point in time, nanoseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Unix epoch.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Current wall-clock time.
    pub fn now() -> Self {
        let d = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(d.as_nanos() as i64)
    }

    /// Build from raw nanoseconds since epoch.
    #[inline]
    pub const fn from_nanos(nanos: i64) -> Self {
        Timestamp(nanos)
    }

    /// Build from seconds since epoch.
    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000_000))
    }

    #[inline]
    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn as_secs(&self) -> i64 {
        self.0.div_euclid(1_000_000_000)
    }

    /// `self + duration`, saturating at `i64::MAX`.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let nanos = duration.as_nanos().min(i64::MAX as u128) as i64;
        Timestamp(self.0.saturating_add(nanos))
    }

    /// Seconds remaining until this deadline, or `None` if already past.
    pub fn remaining_secs(&self, now: Timestamp) -> Option<i64> {
        if self.0 <= now.0 {
            None
        } else {
            // round up so a sub-second remainder still reports at least 1s
            Some((self.0 - now.0 + 999_999_999) / 1_000_000_000)
        }
    }

    pub fn is_past(&self, now: Timestamp) -> bool {
        self.0 <= now.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}
