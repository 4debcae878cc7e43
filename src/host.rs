//! Capabilities the monitor needs from the host simulation.
//!
//! The monitor only observes and corrects. Physics, navigation, spawning
//! and input collection stay in the host and are reached through these
//! traits.

use serde::{Deserialize, Serialize};

use crate::engine::{SimTime, Vec2, Vec3};

/// Stable identity of a host entity.
///
/// Survives pooling: when the host reuses an identity for a logically new
/// entity it must call `Monitor::reset_entity`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of movement intent for an entity.
pub trait MovementInput {
    /// Whether the entity is currently being asked to move.
    fn has_non_zero_movement_input(&self) -> bool;
}

/// Movement intent read from the player's input device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Planar stick/keyboard input.
    pub move_xz: Vec2,
}

impl MovementInput for PlayerInput {
    fn has_non_zero_movement_input(&self) -> bool {
        !self.move_xz.is_zero()
    }
}

/// Movement intent read from an AI-driven entity's locomotion animation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnimationInput {
    /// Planar animation blend input.
    pub move_xz: Vec2,
}

impl MovementInput for AiAnimationInput {
    fn has_non_zero_movement_input(&self) -> bool {
        !self.move_xz.is_zero()
    }
}

/// Per-entity queries and actuators.
pub trait MonitoredEntity {
    /// Stable identity.
    fn id(&self) -> EntityId;

    /// Display name for logs.
    fn name(&self) -> &str;

    /// Whether this is the privileged (user-controlled) entity.
    fn is_privileged(&self) -> bool;

    /// Inactive entities are skipped by scans and dropped from the watched set.
    fn is_active(&self) -> bool;

    /// Current world position.
    fn position(&self) -> Vec3;

    /// Movement intent source for this entity.
    fn movement_input(&self) -> &dyn MovementInput;

    /// Character controller reports the falling locomotion state.
    fn is_falling_status(&self) -> bool;

    /// Vertical velocity is negative.
    fn is_descending_vertically(&self) -> bool;

    /// Character controller reports standing on walkable ground.
    fn is_grounded(&self) -> bool;

    /// Probe downwards for standable ground. `f64::INFINITY` when nothing
    /// is within probe range. May refresh the cached grounded flag.
    fn ground_distance(&mut self) -> f64;

    /// Drop onto the ground below and switch to walking locomotion.
    fn snap_to_ground(&mut self);

    /// Nearest position within `radius` from which a navigation path
    /// `forward_distance` ahead can be taken.
    fn find_navigable_near(&self, radius: f64, forward_distance: f64) -> Option<Vec3>;

    /// Move instantly to `position`.
    fn teleport_to(&mut self, position: Vec3);

    /// Nearest known navigation waypoint.
    fn nearest_waypoint(&self, _radius: f64, _forward_distance: f64) -> Option<Vec3> {
        None
    }

    /// Exit of the transition point (door, portal) this entity used last.
    fn last_transition_exit(&self) -> Option<Vec3> {
        None
    }

    /// Exit of the closest structural entry point.
    fn closest_entry_exit(&self) -> Option<Vec3> {
        None
    }

    /// Take the entity out of play; the host's spawner decides when and
    /// where it comes back.
    fn deactivate(&mut self);
}

/// The simulation the monitor is attached to.
pub trait SimulationHost {
    /// Concrete entity type.
    type Entity: MonitoredEntity;

    /// Current simulation time. Must be non-decreasing.
    fn now(&self) -> SimTime;

    /// Simulation paused; the monitor will not tick.
    fn is_paused(&self) -> bool;

    /// Simulation in its play state (not a menu or loading screen).
    fn is_playing(&self) -> bool {
        true
    }

    /// Identities of the whole monitored population, in a stable order.
    fn entity_ids(&self) -> Vec<EntityId>;

    /// The privileged entity, if there is one.
    fn privileged_id(&self) -> Option<EntityId>;

    /// Resolve an identity for reading.
    fn entity(&self, id: EntityId) -> Option<&Self::Entity>;

    /// Resolve an identity.
    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Self::Entity>;
}
