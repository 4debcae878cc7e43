//! # simwatch
//!
//! Entity health monitor for tick-driven simulations.
//!
//! Watches a population of simulated entities for three locomotion
//! anomalies (falling, airborne, input without movement), confirms them
//! after a per-class dwell time, and after a grace time applies a fix
//! (snap to ground, or teleport to safe ground) through the host.
//!
//! ## Example
//!
//! ```rust
//! use simwatch::prelude::*;
//!
//! let mut world = SandboxWorld::new(0.1);
//! let mut npc = SandboxActor::new(EntityId::new(1), "npc", Vec3::zero());
//! npc.set_airborne(true);
//! world.add_actor(npc);
//!
//! let config = WatchConfig::builder().scan_interval(0.5).build();
//! let mut monitor = Monitor::attach(&config, &world);
//! for _ in 0..100 {
//!     world.step();
//!     monitor.tick(&mut world);
//! }
//! assert_eq!(monitor.history(EntityId::new(1)).map(HistoryLog::len), Some(1));
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::too_many_lines,
    clippy::too_many_arguments,
    clippy::missing_const_for_fn,  // Many functions can't be const in stable Rust
)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod monitor;
pub mod sandbox;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{AnomalyDurations, WatchConfig, WatchConfigBuilder};
    pub use crate::engine::{SimClock, SimTime, Vec2, Vec3};
    pub use crate::error::{WatchError, WatchResult};
    pub use crate::host::{EntityId, MonitoredEntity, MovementInput, SimulationHost};
    pub use crate::monitor::{
        AnomalyKind, HistoryLog, Monitor, MonitorReport, RemediationKind, TickStatus,
        TickSummary,
    };
    pub use crate::sandbox::{SandboxActor, SandboxWorld, Scenario};
}

/// Re-export for public API
pub use error::{WatchError, WatchResult};
