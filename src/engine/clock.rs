//! Fixed-step simulation clock.
//!
//! Drives the sandbox host. A paused clock refuses to advance, which is
//! what the monitor's skip-while-paused guard relies on.

use serde::{Deserialize, Serialize};

use crate::engine::SimTime;

/// Simulation clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Current simulation time.
    current: SimTime,
    /// Timestep duration in nanoseconds.
    timestep_nanos: u64,
    /// Number of steps taken.
    step_count: u64,
    /// While set, `tick` is a no-op.
    paused: bool,
}

impl SimClock {
    /// Create a new clock with the given timestep in seconds.
    ///
    /// # Panics
    ///
    /// Panics if timestep is not positive or not finite.
    #[must_use]
    pub fn new(timestep_secs: f64) -> Self {
        assert!(timestep_secs > 0.0, "Timestep must be positive");
        assert!(timestep_secs.is_finite(), "Timestep must be finite");

        Self::from_nanos(SimTime::from_secs(timestep_secs).as_nanos())
    }

    /// Create a new clock with timestep in nanoseconds.
    #[must_use]
    pub const fn from_nanos(timestep_nanos: u64) -> Self {
        Self {
            current: SimTime::ZERO,
            timestep_nanos,
            step_count: 0,
            paused: false,
        }
    }

    /// Get current simulation time.
    #[must_use]
    pub const fn current_time(&self) -> SimTime {
        self.current
    }

    /// Get timestep duration as seconds.
    #[must_use]
    pub fn timestep_secs(&self) -> f64 {
        self.timestep_nanos as f64 / 1_000_000_000.0
    }

    /// Get number of steps taken.
    #[must_use]
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Whether the clock is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause or resume the clock.
    #[allow(clippy::missing_const_for_fn)] // Mutable const not stable
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Advance clock by one timestep.
    ///
    /// Returns the new time (unchanged while paused).
    #[allow(clippy::missing_const_for_fn)] // Mutable const not stable
    pub fn tick(&mut self) -> SimTime {
        if !self.paused {
            self.current = self.current.add_nanos(self.timestep_nanos);
            self.step_count += 1;
        }
        self.current
    }

    /// Advance clock by multiple timesteps.
    pub fn tick_n(&mut self, n: u64) -> SimTime {
        for _ in 0..n {
            self.tick();
        }
        self.current
    }

    /// Number of steps needed to cover `duration`, rounded up.
    #[must_use]
    pub fn steps_for(&self, duration: SimTime) -> u64 {
        if self.timestep_nanos == 0 {
            return 0;
        }
        duration.as_nanos().div_ceil(self.timestep_nanos)
    }
}

impl Default for SimClock {
    fn default() -> Self {
        // 60 Hz frame step
        Self::from_nanos(16_666_667)
    }
}
