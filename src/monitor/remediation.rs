//! Remediation dispatch onto host actuators.
//!
//! # Teleport fallback chain
//!
//! 1. Navigable point near the entity.
//! 2. Privileged entity only: nearest waypoint, then the exit of the last
//!    transition it used, then the closest structural entry.
//! 3. Anything else that found nothing is deactivated and left for the
//!    host's spawner.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::Vec3;
use crate::error::{WatchError, WatchResult};
use crate::host::MonitoredEntity;
use crate::monitor::policy::{AnomalyKind, RemediationKind};

/// Parameters for the navigable-position search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavigationSearch {
    /// Radius around a candidate point that must be clear for navigation.
    pub radius: f64,
    /// Distance ahead a navigation path must be obtainable.
    pub forward_distance: f64,
}

impl Default for NavigationSearch {
    fn default() -> Self {
        Self {
            radius: 1.2,
            forward_distance: 1.0,
        }
    }
}

/// Where a teleport-to-safe-ground ended up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "via", content = "position")]
pub enum TeleportOutcome {
    /// Clear navigable point near the entity.
    NavigablePoint(Vec3),
    /// Nearest navigation waypoint.
    Waypoint(Vec3),
    /// Exit of the last transition point used.
    LastTransition(Vec3),
    /// Exit of the closest structural entry point.
    ClosestEntry(Vec3),
    /// Nothing found; entity taken out of play.
    Deactivated,
    /// Nothing found for the privileged entity; left in place.
    Stranded,
}

/// Result of a dispatched fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixOutcome {
    /// Snapped to the ground in place.
    Snapped,
    /// Teleported (or deactivated) through the fallback chain.
    Teleported(TeleportOutcome),
}

/// Run `remediation` against `entity`.
///
/// # Errors
///
/// Returns `UnknownRemediation` when `remediation` has no actuator; the
/// entity is left untouched.
pub fn dispatch<E>(
    entity: &mut E,
    remediation: RemediationKind,
    problem: AnomalyKind,
    search: NavigationSearch,
) -> WatchResult<FixOutcome>
where
    E: MonitoredEntity + ?Sized,
{
    match remediation {
        RemediationKind::SnapToGround => {
            entity.snap_to_ground();
            Ok(FixOutcome::Snapped)
        }
        RemediationKind::TeleportToSafeGround => Ok(FixOutcome::Teleported(
            teleport_to_safe_ground(entity, search),
        )),
        RemediationKind::None => Err(WatchError::UnknownRemediation {
            remediation,
            problem,
        }),
    }
}

/// Move `entity` somewhere it can navigate from again.
pub fn teleport_to_safe_ground<E>(entity: &mut E, search: NavigationSearch) -> TeleportOutcome
where
    E: MonitoredEntity + ?Sized,
{
    let origin = entity.position();

    if let Some(target) = entity.find_navigable_near(search.radius, search.forward_distance) {
        entity.teleport_to(target);
        return TeleportOutcome::NavigablePoint(target);
    }

    if !entity.is_privileged() {
        info!(
            entity = %entity.id(),
            name = entity.name(),
            %origin,
            "no navigable point nearby, deactivating"
        );
        entity.deactivate();
        return TeleportOutcome::Deactivated;
    }

    let outcome = if let Some(target) =
        entity.nearest_waypoint(search.radius, search.forward_distance)
    {
        TeleportOutcome::Waypoint(target)
    } else if let Some(target) = entity.last_transition_exit() {
        TeleportOutcome::LastTransition(target)
    } else if let Some(target) = entity.closest_entry_exit() {
        // May land somewhere the entity could not have walked to.
        TeleportOutcome::ClosestEntry(target)
    } else {
        warn!(
            entity = %entity.id(),
            name = entity.name(),
            %origin,
            "no safe ground found for privileged entity, leaving in place"
        );
        return TeleportOutcome::Stranded;
    };

    if let TeleportOutcome::Waypoint(target)
    | TeleportOutcome::LastTransition(target)
    | TeleportOutcome::ClosestEntry(target) = outcome
    {
        entity.teleport_to(target);
    }
    outcome
}
