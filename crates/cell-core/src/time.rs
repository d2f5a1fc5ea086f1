//! Simulation time model.
//!
//! # Design
//!
//! Time is an absolute `u64` count of nanoseconds since simulation start.
//! Integer nanoseconds keep all delay arithmetic exact (no floating-point
//! drift) and make ordering comparisons O(1); the time authority exchanges
//! times in the same unit.

use std::fmt;

pub const NANOSECOND: u64 = 1;
pub const MICROSECOND: u64 = 1_000 * NANOSECOND;
pub const MILLISECOND: u64 = 1_000 * MICROSECOND;
pub const SECOND: u64 = 1_000 * MILLISECOND;

// ── SimTime ───────────────────────────────────────────────────────────────────

/// An absolute simulation time in nanoseconds.
///
/// A u64 of nanoseconds lasts ~584 years of simulated time.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX: SimTime = SimTime(u64::MAX);

    #[inline]
    pub const fn from_nanos(ns: u64) -> SimTime {
        SimTime(ns)
    }

    #[inline]
    pub const fn from_millis(ms: u64) -> SimTime {
        SimTime(ms * MILLISECOND)
    }

    #[inline]
    pub const fn from_secs(secs: u64) -> SimTime {
        SimTime(secs * SECOND)
    }

    /// Truncating conversion from fractional seconds.  Negative and NaN
    /// inputs clamp to zero.
    #[inline]
    pub fn from_secs_f64(secs: f64) -> SimTime {
        SimTime((secs * SECOND as f64).max(0.0) as u64)
    }

    #[inline]
    pub fn as_nanos(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / SECOND as f64
    }

    /// Return the time `ns` nanoseconds after `self`, saturating at `MAX`.
    #[inline]
    pub fn offset(self, ns: u64) -> SimTime {
        SimTime(self.0.saturating_add(ns))
    }

    /// Nanoseconds elapsed from `earlier` to `self`; zero if `earlier` is later.
    #[inline]
    pub fn since(self, earlier: SimTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs: u64) -> SimTime {
        SimTime(self.0 + rhs)
    }
}

impl std::ops::Sub for SimTime {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: SimTime) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    /// Formats as seconds with nanosecond precision, e.g. `1.200000000s`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.0 / SECOND, self.0 % SECOND)
    }
}
