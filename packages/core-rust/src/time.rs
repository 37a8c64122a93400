//! Protocol timestamps and an injectable clock.
//!
//! # Wire format
//!
//! `UtcTime` counts 100-nanosecond intervals since 1601-01-01 UTC, the epoch the
//! protocol's `DateTime` uses. Zero means "not set" on the wire, which this crate
//! models as `Option<UtcTime>` instead.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Ticks between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

const TICKS_PER_MILLI: i64 = 10_000;

/// A point in time, in protocol ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtcTime(pub i64);

impl UtcTime {
    #[must_use]
    pub fn from_unix_millis(millis: u64) -> Self {
        let millis = i64::try_from(millis).unwrap_or(i64::MAX);
        Self(UNIX_EPOCH_TICKS.saturating_add(millis.saturating_mul(TICKS_PER_MILLI)))
    }

    /// Milliseconds since the Unix epoch, clamped at zero for earlier instants.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn to_unix_millis(self) -> u64 {
        (self.0.saturating_sub(UNIX_EPOCH_TICKS) / TICKS_PER_MILLI).max(0) as u64
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from_unix_millis(SystemClock.now())
    }

    #[must_use]
    pub fn ticks(self) -> i64 {
        self.0
    }
}

/// Abstraction over the system clock for dependency injection.
///
/// Allows deterministic testing of anything time-dependent (continuation point
/// expiry in particular) by replacing the real clock with a virtual one.
pub trait ClockSource: Send + Sync {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now(&self) -> u64;
}

/// Default clock source that reads the real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}
