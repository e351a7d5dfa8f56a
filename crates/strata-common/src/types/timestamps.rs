//! Commit timestamp type for StrataDB.
//!
//! The store never generates commit timestamps itself: callers obtain them
//! from an external clock (a hybrid logical clock in a clustered deployment)
//! and pass them to `commit`. The only contract this core relies on is a
//! strict total order comparable with `<`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, totally ordered commit timestamp.
///
/// Version visibility intervals are half-open `[begin, end)` ranges over
/// these timestamps. A version committed at `ts` is visible to reads at
/// `ts` and later, until superseded.
///
/// # Example
///
/// ```rust
/// use strata_common::types::Timestamp;
///
/// let t1 = Timestamp::new(100);
/// let t2 = Timestamp::new(200);
/// assert!(t1 < t2);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Zero timestamp - precedes every commit.
    pub const ZERO: Self = Self(0);

    /// Maximum timestamp value.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a timestamp from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(ts: u64) -> Self {
        Self(ts)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the immediately following timestamp.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the immediately preceding timestamp.
    #[inline]
    #[must_use]
    pub const fn prev(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// Checks if this timestamp is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    #[inline]
    fn from(ts: u64) -> Self {
        Self::new(ts)
    }
}

impl From<Timestamp> for u64 {
    #[inline]
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
