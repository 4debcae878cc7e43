//! Problem policy: how long an anomaly must persist before it counts, how
//! long a confirmed problem is tolerated, and what fixes it.
//!
//! All three tables are keyed by [`AnomalyKind`] with an exhaustive match.
//! `AnomalyKind::None` has no entry in any table, so a lookup for it is the
//! reachable unmapped branch and comes back as
//! [`WatchError::UnmappedProblem`].

use serde::{Deserialize, Serialize};

use crate::config::{AnomalyDurations, WatchConfig};
use crate::engine::SimTime;
use crate::error::{WatchError, WatchResult};

/// Anomaly classification, used both for the tentative label and the
/// confirmed problem. `None` means no anomaly / no active problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyKind {
    /// Nothing wrong.
    #[default]
    None,
    /// Movement input is held but the entity has not moved.
    InputWithoutMovement,
    /// Entity is falling and moving downwards.
    Falling,
    /// Entity is off the ground without falling.
    Airborne,
}

impl AnomalyKind {
    /// Whether this is an actual anomaly.
    #[must_use]
    pub const fn is_some(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether this is `None`.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Corrective action for a confirmed problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemediationKind {
    /// No action.
    #[default]
    None,
    /// Drop the entity onto the ground below it and restore walking.
    SnapToGround,
    /// Move the entity to the nearest navigable position.
    TeleportToSafeGround,
}

/// Which policy table a lookup consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyTable {
    /// Dwell time before confirmation.
    DwellTime,
    /// Grace time before remediation.
    GraceTime,
    /// Remediation action.
    Remediation,
}

impl std::fmt::Display for PolicyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DwellTime => "dwell time",
            Self::GraceTime => "grace time",
            Self::Remediation => "remediation",
        };
        f.write_str(name)
    }
}

/// One duration per anomaly class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerAnomaly {
    /// Duration for [`AnomalyKind::InputWithoutMovement`].
    pub input_without_movement: SimTime,
    /// Duration for [`AnomalyKind::Falling`].
    pub falling: SimTime,
    /// Duration for [`AnomalyKind::Airborne`].
    pub airborne: SimTime,
}

impl PerAnomaly {
    fn from_secs(durations: &AnomalyDurations) -> Self {
        Self {
            input_without_movement: SimTime::from_secs_saturating(
                durations.input_without_movement,
            ),
            falling: SimTime::from_secs_saturating(durations.falling),
            airborne: SimTime::from_secs_saturating(durations.airborne),
        }
    }

    const fn get(&self, kind: AnomalyKind) -> Option<SimTime> {
        match kind {
            AnomalyKind::InputWithoutMovement => Some(self.input_without_movement),
            AnomalyKind::Falling => Some(self.falling),
            AnomalyKind::Airborne => Some(self.airborne),
            AnomalyKind::None => None,
        }
    }
}

/// Dwell and grace tables plus the fixed remediation mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemPolicy {
    dwell: PerAnomaly,
    grace: PerAnomaly,
}

impl ProblemPolicy {
    /// Create a policy from explicit tables.
    #[must_use]
    pub const fn new(dwell: PerAnomaly, grace: PerAnomaly) -> Self {
        Self { dwell, grace }
    }

    /// Build the policy from configuration.
    #[must_use]
    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(
            PerAnomaly::from_secs(&config.dwell),
            PerAnomaly::from_secs(&config.grace),
        )
    }

    /// Minimum continuous time a tentative anomaly must be observed before
    /// it is confirmed.
    ///
    /// # Errors
    ///
    /// Returns `UnmappedProblem` for a kind with no dwell entry.
    pub fn dwell_time(&self, kind: AnomalyKind) -> WatchResult<SimTime> {
        self.dwell.get(kind).ok_or(WatchError::UnmappedProblem {
            kind,
            table: PolicyTable::DwellTime,
        })
    }

    /// Time a confirmed problem is tolerated before it is fixed.
    ///
    /// # Errors
    ///
    /// Returns `UnmappedProblem` for a kind with no grace entry.
    pub fn grace_time(&self, kind: AnomalyKind) -> WatchResult<SimTime> {
        self.grace.get(kind).ok_or(WatchError::UnmappedProblem {
            kind,
            table: PolicyTable::GraceTime,
        })
    }

    /// Fix applied to a confirmed problem.
    ///
    /// Falling and stuck entities need a new location; an entity hovering
    /// in place can be dropped where it is.
    ///
    /// # Errors
    ///
    /// Returns `UnmappedProblem` for `AnomalyKind::None`.
    pub const fn remediation_for(kind: AnomalyKind) -> WatchResult<RemediationKind> {
        match kind {
            AnomalyKind::InputWithoutMovement | AnomalyKind::Falling => {
                Ok(RemediationKind::TeleportToSafeGround)
            }
            AnomalyKind::Airborne => Ok(RemediationKind::SnapToGround),
            AnomalyKind::None => Err(WatchError::UnmappedProblem {
                kind,
                table: PolicyTable::Remediation,
            }),
        }
    }
}

impl Default for ProblemPolicy {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}
