//! In-memory host for scripted runs and tests.
//!
//! [`SandboxWorld`] implements [`SimulationHost`] over a fixed-step
//! [`SimClock`] and a list of [`SandboxActor`]s. Actors carry scripted
//! locomotion phases (walking, stuck, airborne, falling) instead of
//! physics, and count every actuator call the monitor makes on them.

pub mod scenario;

use serde::{Deserialize, Serialize};

use crate::engine::{SimClock, SimTime, Vec2, Vec3};
use crate::host::{
    AiAnimationInput, EntityId, MonitoredEntity, MovementInput, PlayerInput, SimulationHost,
};

pub use scenario::{Phase, Scenario, ScenarioOutcome};

/// Walking speed in world units per second.
pub const WALK_SPEED: f64 = 1.5;

/// Descent speed while falling, world units per second.
pub const FALL_SPEED: f64 = 9.0;

/// Scripted locomotion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorState {
    /// Standing still, no input.
    Grounded,
    /// Moving forward with input held.
    Walking,
    /// Input held against something; position does not change.
    Stuck,
    /// Off the ground, hovering.
    Airborne,
    /// Falling status and descending.
    Falling,
    /// Taken out of play.
    Inactive,
}

/// Where an actor's movement intent comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActorInput {
    /// Player device.
    Player(PlayerInput),
    /// AI locomotion animation.
    Ai(AiAnimationInput),
}

impl ActorInput {
    fn set(&mut self, move_xz: Vec2) {
        match self {
            Self::Player(input) => input.move_xz = move_xz,
            Self::Ai(input) => input.move_xz = move_xz,
        }
    }

    fn as_dyn(&self) -> &dyn MovementInput {
        match self {
            Self::Player(input) => input,
            Self::Ai(input) => input,
        }
    }
}

/// Scripted entity.
#[derive(Debug, Clone)]
pub struct SandboxActor {
    id: EntityId,
    name: String,
    privileged: bool,
    active: bool,
    position: Vec3,
    input: ActorInput,

    grounded: bool,
    falling_status: bool,
    descending: bool,
    height_above_ground: f64,

    navigable_point: Option<Vec3>,
    waypoint: Option<Vec3>,
    last_transition_exit: Option<Vec3>,
    closest_entry_exit: Option<Vec3>,

    phases: Vec<Phase>,
    next_phase: usize,
    state: Option<ActorState>,
    // Set by a fix; suppresses the current phase until the next one starts.
    recovered: bool,

    snap_count: u32,
    teleport_count: u32,
    deactivate_count: u32,
}

impl SandboxActor {
    /// Grounded, active, AI-driven actor at `position`.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            privileged: false,
            active: true,
            position,
            input: ActorInput::Ai(AiAnimationInput::default()),
            grounded: true,
            falling_status: false,
            descending: false,
            height_above_ground: 0.0,
            navigable_point: None,
            waypoint: None,
            last_transition_exit: None,
            closest_entry_exit: None,
            phases: Vec::new(),
            next_phase: 0,
            state: None,
            recovered: false,
            snap_count: 0,
            teleport_count: 0,
            deactivate_count: 0,
        }
    }

    /// Mark as the privileged entity. Privileged actors read player input.
    pub fn set_privileged(&mut self, privileged: bool) {
        self.privileged = privileged;
        self.input = if privileged {
            ActorInput::Player(PlayerInput::default())
        } else {
            ActorInput::Ai(AiAnimationInput::default())
        };
    }

    /// Put the actor in or out of play.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Leave the ground without falling, or land again.
    pub fn set_airborne(&mut self, airborne: bool) {
        self.grounded = !airborne;
        self.falling_status = false;
        self.descending = false;
    }

    /// Fall: falling status, descending, not grounded. `false` lands.
    pub fn set_falling(&mut self, falling: bool) {
        self.grounded = !falling;
        self.falling_status = falling;
        self.descending = falling;
    }

    /// Toggle only the controller's falling status.
    pub fn set_falling_status_only(&mut self, falling: bool) {
        self.falling_status = falling;
    }

    /// Distance reported by the ground probe.
    pub fn set_height_above_ground(&mut self, height: f64) {
        self.height_above_ground = height;
    }

    /// Hold player input. Switches the actor to player input.
    pub fn set_player_input(&mut self, move_xz: Vec2) {
        self.input = ActorInput::Player(PlayerInput { move_xz });
    }

    /// Hold AI locomotion input. Switches the actor to AI input.
    pub fn set_ai_input(&mut self, move_xz: Vec2) {
        self.input = ActorInput::Ai(AiAnimationInput { move_xz });
    }

    /// Result of the navigable-point search.
    pub fn set_navigable_point(&mut self, point: Option<Vec3>) {
        self.navigable_point = point;
    }

    /// Nearest waypoint.
    pub fn set_waypoint(&mut self, point: Option<Vec3>) {
        self.waypoint = point;
    }

    /// Exit of the last used transition.
    pub fn set_last_transition_exit(&mut self, point: Option<Vec3>) {
        self.last_transition_exit = point;
    }

    /// Exit of the closest structural entry.
    pub fn set_closest_entry_exit(&mut self, point: Option<Vec3>) {
        self.closest_entry_exit = point;
    }

    /// Script locomotion phases. Sorted by start time.
    pub fn set_phases(&mut self, mut phases: Vec<Phase>) {
        phases.sort_by_key(|phase| phase.at);
        self.phases = phases;
        self.next_phase = 0;
        self.state = None;
    }

    /// Reuse this actor for a new entity at `position`. The running phase
    /// stops applying until the next one starts.
    pub fn respawn(&mut self, position: Vec3) {
        self.position = position;
        self.active = true;
        self.land();
        self.recovered = true;
    }

    /// Current scripted state, `None` before the first phase.
    #[must_use]
    pub const fn state(&self) -> Option<ActorState> {
        self.state
    }

    /// Calls to `snap_to_ground`.
    #[must_use]
    pub const fn snap_count(&self) -> u32 {
        self.snap_count
    }

    /// Calls to `teleport_to`.
    #[must_use]
    pub const fn teleport_count(&self) -> u32 {
        self.teleport_count
    }

    /// Calls to `deactivate`.
    #[must_use]
    pub const fn deactivate_count(&self) -> u32 {
        self.deactivate_count
    }

    fn land(&mut self) {
        self.grounded = true;
        self.falling_status = false;
        self.descending = false;
        self.height_above_ground = 0.0;
        self.input.set(Vec2::zero());
    }

    fn enter(&mut self, state: ActorState) {
        self.state = Some(state);
        self.recovered = false;
        match state {
            ActorState::Grounded => self.land(),
            ActorState::Walking | ActorState::Stuck => {
                self.land();
                self.input.set(Vec2::new(0.0, 1.0));
            }
            ActorState::Airborne => {
                self.set_airborne(true);
                self.input.set(Vec2::zero());
            }
            ActorState::Falling => {
                self.set_falling(true);
                self.input.set(Vec2::zero());
            }
            ActorState::Inactive => self.active = false,
        }
    }

    /// Apply phases due at `now`, then integrate one step of `dt` seconds.
    fn advance(&mut self, now: SimTime, dt: f64) {
        while let Some(phase) = self.phases.get(self.next_phase).copied() {
            if phase.at > now {
                break;
            }
            self.next_phase += 1;
            self.enter(phase.state);
        }

        if !self.active || self.recovered {
            return;
        }
        match self.state {
            Some(ActorState::Walking) => {
                self.position = self.position + Vec3::new(0.0, 0.0, WALK_SPEED * dt);
            }
            Some(ActorState::Falling) => {
                self.position = self.position - Vec3::new(0.0, FALL_SPEED * dt, 0.0);
            }
            _ => {}
        }
    }
}

impl MonitoredEntity for SandboxActor {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn movement_input(&self) -> &dyn MovementInput {
        self.input.as_dyn()
    }

    fn is_falling_status(&self) -> bool {
        self.falling_status
    }

    fn is_descending_vertically(&self) -> bool {
        self.descending
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn ground_distance(&mut self) -> f64 {
        self.height_above_ground
    }

    fn snap_to_ground(&mut self) {
        self.position = self.position - Vec3::new(0.0, self.height_above_ground, 0.0);
        self.land();
        self.recovered = true;
        self.snap_count += 1;
    }

    fn find_navigable_near(&self, _radius: f64, _forward_distance: f64) -> Option<Vec3> {
        self.navigable_point
    }

    fn teleport_to(&mut self, position: Vec3) {
        self.position = position;
        self.grounded = true;
        self.falling_status = false;
        self.descending = false;
        self.height_above_ground = 0.0;
        self.recovered = true;
        self.teleport_count += 1;
    }

    fn nearest_waypoint(&self, _radius: f64, _forward_distance: f64) -> Option<Vec3> {
        self.waypoint
    }

    fn last_transition_exit(&self) -> Option<Vec3> {
        self.last_transition_exit
    }

    fn closest_entry_exit(&self) -> Option<Vec3> {
        self.closest_entry_exit
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.deactivate_count += 1;
    }
}

/// Fixed-step host world.
#[derive(Debug, Clone)]
pub struct SandboxWorld {
    clock: SimClock,
    actors: Vec<SandboxActor>,
    playing: bool,
}

impl SandboxWorld {
    /// Empty world stepping `timestep_secs` per step.
    ///
    /// # Panics
    ///
    /// Panics if the timestep is not positive and finite.
    #[must_use]
    pub fn new(timestep_secs: f64) -> Self {
        Self {
            clock: SimClock::new(timestep_secs),
            actors: Vec::new(),
            playing: true,
        }
    }

    /// Add an actor. Replaces any actor with the same id.
    pub fn add_actor(&mut self, actor: SandboxActor) {
        if let Some(existing) = self.actor_mut(actor.id) {
            *existing = actor;
        } else {
            self.actors.push(actor);
        }
    }

    /// Actor lookup.
    #[must_use]
    pub fn actor(&self, id: EntityId) -> Option<&SandboxActor> {
        self.actors.iter().find(|actor| actor.id == id)
    }

    /// Mutable actor lookup.
    pub fn actor_mut(&mut self, id: EntityId) -> Option<&mut SandboxActor> {
        self.actors.iter_mut().find(|actor| actor.id == id)
    }

    /// Remove an actor from the world entirely.
    pub fn remove_actor(&mut self, id: EntityId) -> Option<SandboxActor> {
        let index = self.actors.iter().position(|actor| actor.id == id)?;
        Some(self.actors.remove(index))
    }

    /// All actors in insertion order.
    #[must_use]
    pub fn actors(&self) -> &[SandboxActor] {
        &self.actors
    }

    /// Pause or resume the clock.
    pub fn set_paused(&mut self, paused: bool) {
        self.clock.set_paused(paused);
    }

    /// Enter or leave the play state.
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Clock.
    #[must_use]
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Advance one step and run actor scripts. Nothing moves while paused.
    pub fn step(&mut self) -> SimTime {
        if self.clock.is_paused() {
            return self.clock.current_time();
        }
        let now = self.clock.tick();
        let dt = self.clock.timestep_secs();
        for actor in &mut self.actors {
            actor.advance(now, dt);
        }
        now
    }

    /// Apply phases due at the current time without advancing the clock.
    pub fn settle(&mut self) {
        let now = self.clock.current_time();
        for actor in &mut self.actors {
            actor.advance(now, 0.0);
        }
    }
}

impl SimulationHost for SandboxWorld {
    type Entity = SandboxActor;

    fn now(&self) -> SimTime {
        self.clock.current_time()
    }

    fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        self.actors.iter().map(|actor| actor.id).collect()
    }

    fn privileged_id(&self) -> Option<EntityId> {
        self.actors
            .iter()
            .find(|actor| actor.privileged)
            .map(|actor| actor.id)
    }

    fn entity(&self, id: EntityId) -> Option<&SandboxActor> {
        self.actor(id)
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut SandboxActor> {
        self.actor_mut(id)
    }
}
