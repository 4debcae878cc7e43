//! Simulation time, clock, and vector primitives.
//!
//! The monitor never owns the host's clock; it reads `now` each tick and
//! measures dwell and grace windows as differences between `SimTime`s.

pub mod clock;
pub mod state;

use serde::{Deserialize, Serialize};

pub use clock::SimClock;
pub use state::{Vec2, Vec3};

/// Simulation time representation.
///
/// Uses a fixed-point representation for reproducibility across platforms.
/// Internal representation is in nanoseconds to avoid floating-point issues.
/// Also used for durations (dwell, grace, scan interval).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SimTime {
    /// Time in nanoseconds from simulation start.
    nanos: u64,
}

impl SimTime {
    /// Zero time (simulation start).
    pub const ZERO: Self = Self { nanos: 0 };

    /// Create time from seconds.
    ///
    /// # Panics
    ///
    /// Panics if seconds is negative or not finite.
    #[must_use]
    pub fn from_secs(secs: f64) -> Self {
        assert!(secs >= 0.0, "SimTime cannot be negative");
        assert!(secs.is_finite(), "SimTime must be finite");
        Self::from_secs_saturating(secs)
    }

    /// Create time from seconds, clamping negatives to zero and
    /// non-finite or oversized values to `u64::MAX` nanoseconds.
    #[must_use]
    pub fn from_secs_saturating(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            return Self::ZERO;
        }
        let nanos = secs * 1_000_000_000.0;
        if !nanos.is_finite() || nanos >= u64::MAX as f64 {
            return Self { nanos: u64::MAX };
        }
        Self {
            nanos: nanos as u64,
        }
    }

    /// Create time from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Get time as seconds (f64).
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.nanos as f64 / 1_000_000_000.0
    }

    /// Get time as nanoseconds.
    #[must_use]
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// Add duration to time.
    #[must_use]
    pub const fn add_nanos(self, nanos: u64) -> Self {
        Self {
            nanos: self.nanos.saturating_add(nanos),
        }
    }

    /// Subtract duration from time, saturating at zero.
    #[must_use]
    pub const fn saturating_sub_nanos(self, nanos: u64) -> Self {
        Self {
            nanos: self.nanos.saturating_sub(nanos),
        }
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    #[must_use]
    pub const fn since(self, earlier: Self) -> Self {
        Self {
            nanos: self.nanos.saturating_sub(earlier.nanos),
        }
    }
}

impl std::ops::Add for SimTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            nanos: self.nanos.saturating_add(rhs.nanos),
        }
    }
}

impl std::ops::Sub for SimTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self.since(rhs)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_time_creation() {
        let t1 = SimTime::from_secs(1.5);
        assert!((t1.as_secs_f64() - 1.5).abs() < 1e-9);

        let t2 = SimTime::from_nanos(1_500_000_000);
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_sim_time_arithmetic() {
        let t1 = SimTime::from_secs(1.0);
        let t2 = SimTime::from_secs(0.5);

        let sum = t1 + t2;
        assert!((sum.as_secs_f64() - 1.5).abs() < 1e-9);

        let diff = t1 - t2;
        assert!((diff.as_secs_f64() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sim_time_since_saturates() {
        let t1 = SimTime::from_secs(1.0);
        let t2 = SimTime::from_secs(2.0);
        assert_eq!(t1.since(t2), SimTime::ZERO);
        assert_eq!(t2.since(t1), SimTime::from_secs(1.0));
    }

    #[test]
    fn test_sim_time_from_secs_saturating() {
        assert_eq!(SimTime::from_secs_saturating(-3.0), SimTime::ZERO);
        assert_eq!(SimTime::from_secs_saturating(f64::NAN), SimTime::ZERO);
        assert_eq!(
            SimTime::from_secs_saturating(f64::INFINITY).as_nanos(),
            u64::MAX
        );
        assert_eq!(SimTime::from_secs_saturating(2.0), SimTime::from_secs(2.0));
    }

    #[test]
    fn test_sim_time_add_nanos_saturates() {
        let t = SimTime::from_nanos(u64::MAX - 1);
        assert_eq!(t.add_nanos(10).as_nanos(), u64::MAX);
    }

    #[test]
    fn test_sim_time_ordering() {
        let t1 = SimTime::from_secs(1.0);
        let t2 = SimTime::from_secs(2.0);

        assert!(t1 < t2);
        assert!(t2 > t1);
    }

    #[test]
    fn test_sim_time_display() {
        let t = SimTime::from_secs(1.25);
        assert_eq!(t.to_string(), "1.250s");
    }

    #[test]
    fn test_sim_time_saturating_sub() {
        let t = SimTime::from_secs(1.0);
        let t2 = t.saturating_sub_nanos(500_000_000);
        assert!((t2.as_secs_f64() - 0.5).abs() < 1e-9);

        let t3 = t.saturating_sub_nanos(2_000_000_000);
        assert_eq!(t3.as_nanos(), 0);
    }
}
