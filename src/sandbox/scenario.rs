//! YAML-scripted sandbox runs.
//!
//! ```yaml
//! name: stuck-player
//! duration: 10
//! timestep: "100 ms"
//! actors:
//!   - id: 0
//!     name: hero
//!     privileged: true
//!     navigable_point: { x: 1.0, y: 0.0, z: 0.0 }
//!     phases:
//!       - { at: 0.5, state: stuck }
//! pauses:
//!   - { from: 2.0, to: 3.0 }
//! ```
//!
//! Pause windows are measured in frames (wall time), not simulation time:
//! while paused the clock holds still and monitor ticks are skipped.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};
use validator::Validate;

use crate::config::{self, WatchConfig};
use crate::engine::{SimTime, Vec3};
use crate::error::{WatchError, WatchResult};
use crate::host::{EntityId, SimulationHost};
use crate::monitor::{AnomalyKind, Monitor, MonitorReport, RemediationKind, TickStatus};
use crate::sandbox::{ActorState, SandboxActor, SandboxWorld};

/// Scripted state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Phase {
    /// Simulation time the phase starts.
    #[serde(deserialize_with = "sim_time")]
    pub at: SimTime,
    /// State entered.
    pub state: ActorState,
}

fn sim_time<'de, D>(deserializer: D) -> Result<SimTime, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = config::seconds(deserializer)?;
    if secs < 0.0 || !secs.is_finite() {
        return Err(serde::de::Error::custom(format!(
            "phase time must be a non-negative number of seconds, got {secs}"
        )));
    }
    Ok(SimTime::from_secs_saturating(secs))
}

/// One scripted actor.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ActorSpec {
    /// Host identity.
    pub id: u64,
    /// Display name.
    #[validate(length(min = 1))]
    pub name: String,
    /// User-controlled entity.
    #[serde(default)]
    pub privileged: bool,
    /// Start position.
    #[serde(default)]
    pub position: Vec3,
    /// What the ground probe reports.
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub height_above_ground: f64,
    /// Result of the navigable-point search.
    #[serde(default)]
    pub navigable_point: Option<Vec3>,
    /// Nearest waypoint.
    #[serde(default)]
    pub waypoint: Option<Vec3>,
    /// Exit of the last transition used.
    #[serde(default)]
    pub last_transition_exit: Option<Vec3>,
    /// Exit of the closest structural entry.
    #[serde(default)]
    pub closest_entry_exit: Option<Vec3>,
    /// Locomotion script.
    #[serde(default)]
    pub phases: Vec<Phase>,
}

impl ActorSpec {
    fn build(&self) -> SandboxActor {
        let mut actor = SandboxActor::new(EntityId::new(self.id), self.name.clone(), self.position);
        actor.set_privileged(self.privileged);
        actor.set_height_above_ground(self.height_above_ground);
        actor.set_navigable_point(self.navigable_point);
        actor.set_waypoint(self.waypoint);
        actor.set_last_transition_exit(self.last_transition_exit);
        actor.set_closest_entry_exit(self.closest_entry_exit);
        actor.set_phases(self.phases.clone());
        actor
    }
}

/// Wall-clock interval during which the host is paused.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PauseWindow {
    /// Start, seconds of wall time.
    #[serde(deserialize_with = "config::seconds")]
    pub from: f64,
    /// End, exclusive.
    #[serde(deserialize_with = "config::seconds")]
    pub to: f64,
}

impl PauseWindow {
    fn contains(&self, wall: f64) -> bool {
        wall >= self.from && wall < self.to
    }
}

/// Host reuses an identity for a new entity.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespawnEvent {
    /// Simulation time of the respawn.
    #[serde(deserialize_with = "sim_time")]
    pub at: SimTime,
    /// Reused identity.
    pub id: u64,
    /// Spawn position.
    #[serde(default)]
    pub position: Vec3,
}

/// A scripted sandbox run.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Scenario name.
    #[validate(length(min = 1))]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Wall time to run, seconds.
    #[validate(range(min = 0.0, max = 86_400.0))]
    #[serde(deserialize_with = "config::seconds")]
    pub duration: f64,
    /// Host step, seconds.
    #[validate(range(min = 0.0, max = 10.0))]
    #[serde(default = "default_timestep", deserialize_with = "config::seconds")]
    pub timestep: f64,
    /// Monitor settings for this scenario. Defaults apply when absent.
    #[serde(default)]
    pub monitor: Option<WatchConfig>,
    /// Scripted population.
    pub actors: Vec<ActorSpec>,
    /// Host pauses.
    #[serde(default)]
    pub pauses: Vec<PauseWindow>,
    /// Identity reuse events.
    #[serde(default)]
    pub respawns: Vec<RespawnEvent>,
}

const fn default_timestep() -> f64 {
    0.1
}

impl Scenario {
    /// Load a scenario from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> WatchResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a scenario from YAML.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> WatchResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        for actor in &scenario.actors {
            actor.validate()?;
        }
        if let Some(monitor) = &scenario.monitor {
            monitor.validate()?;
            monitor.validate_semantic()?;
        }
        scenario.validate_semantic()?;
        Ok(scenario)
    }

    fn validate_semantic(&self) -> WatchResult<()> {
        if self.timestep <= 0.0 {
            return Err(WatchError::config("timestep must be positive"));
        }
        if self.duration < self.timestep {
            return Err(WatchError::config(format!(
                "duration {}s is shorter than one timestep {}s",
                self.duration, self.timestep
            )));
        }

        if self.actors.is_empty() {
            return Err(WatchError::config("scenario has no actors"));
        }

        let mut ids = HashSet::new();
        for actor in &self.actors {
            if !ids.insert(actor.id) {
                return Err(WatchError::config(format!("duplicate actor id {}", actor.id)));
            }
        }
        if self.actors.iter().filter(|actor| actor.privileged).count() > 1 {
            return Err(WatchError::config("at most one actor can be privileged"));
        }

        for pause in &self.pauses {
            if pause.from < 0.0 || pause.to <= pause.from {
                return Err(WatchError::config(format!(
                    "pause window {}..{} is empty or negative",
                    pause.from, pause.to
                )));
            }
        }

        for respawn in &self.respawns {
            if !ids.contains(&respawn.id) {
                return Err(WatchError::config(format!(
                    "respawn refers to unknown actor {}",
                    respawn.id
                )));
            }
        }

        Ok(())
    }

    /// Monitor settings embedded in the scenario, or defaults.
    #[must_use]
    pub fn monitor_config(&self) -> WatchConfig {
        self.monitor.clone().unwrap_or_default()
    }

    /// Populate a world with the scripted actors.
    ///
    /// # Panics
    ///
    /// Panics if the timestep is not positive; [`Scenario::from_yaml`]
    /// rejects such scenarios.
    #[must_use]
    pub fn build_world(&self) -> SandboxWorld {
        let mut world = SandboxWorld::new(self.timestep);
        for spec in &self.actors {
            world.add_actor(spec.build());
        }
        world.settle();
        world
    }

    fn paused_at(&self, wall: f64) -> bool {
        self.pauses.iter().any(|pause| pause.contains(wall))
    }

    /// Run the scenario against a fresh monitor.
    ///
    /// # Errors
    ///
    /// Returns error if the timestep is not positive.
    pub fn run(&self, config: &WatchConfig) -> WatchResult<ScenarioOutcome> {
        if self.timestep <= 0.0 || !self.timestep.is_finite() {
            return Err(WatchError::config("timestep must be positive"));
        }

        let mut world = self.build_world();
        let mut monitor = Monitor::attach(config, &world);
        let frames = (self.duration / self.timestep).ceil() as u64;

        info!(
            scenario = %self.name,
            actors = self.actors.len(),
            frames,
            detect_only = config.detect_only,
            "running scenario"
        );

        let mut respawns = self.respawns.clone();
        respawns.sort_by_key(|respawn| respawn.at);
        let mut respawns = respawns.into_iter().peekable();

        let mut outcome = ScenarioOutcome::new(&self.name, frames);

        for frame in 0..=frames {
            world.set_paused(self.paused_at(frame as f64 * self.timestep));
            if frame > 0 {
                world.step();
            }

            let now = world.now();
            while let Some(respawn) = respawns.next_if(|respawn| respawn.at <= now) {
                let id = EntityId::new(respawn.id);
                if let Some(actor) = world.actor_mut(id) {
                    actor.respawn(respawn.position);
                }
                monitor.reset_entity(id);
                debug!(entity = %id, %now, "respawned");
            }

            let summary = monitor.tick(&mut world);
            outcome.record(summary.status);
            if summary.scanned {
                outcome.scans += 1;
            }
            for id in summary.fixed {
                let entry = monitor.history(id).and_then(|history| history.latest());
                outcome.fixes.push(FixEvent {
                    time: summary.time,
                    entity: id,
                    problem: entry.map_or(AnomalyKind::None, |e| e.problem()),
                    remediation: entry.map_or(RemediationKind::None, |e| e.remediation()),
                });
            }
            for id in summary.dropped {
                outcome.dropped.push(DropEvent {
                    time: summary.time,
                    entity: id,
                });
            }
        }

        outcome.end_time = world.now();
        outcome.report = monitor.report();

        info!(
            scenario = %self.name,
            end = %outcome.end_time,
            fixes = outcome.fixes.len(),
            skipped = outcome.ticks_skipped,
            "scenario complete"
        );

        Ok(outcome)
    }
}

/// A fix applied during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FixEvent {
    /// Tick time.
    pub time: SimTime,
    /// Fixed entity.
    pub entity: EntityId,
    /// Problem that was fixed.
    pub problem: AnomalyKind,
    /// Action taken.
    pub remediation: RemediationKind,
}

/// A watched entity dropped without a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DropEvent {
    /// Tick time.
    pub time: SimTime,
    /// Dropped entity.
    pub entity: EntityId,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario name.
    pub name: String,
    /// Frames stepped after the initial one.
    pub frames: u64,
    /// Simulation time at the end.
    pub end_time: SimTime,
    /// Ticks that ran.
    pub ticks_ran: u64,
    /// Ticks skipped for any reason.
    pub ticks_skipped: u64,
    /// Population scans.
    pub scans: u64,
    /// Fixes in order.
    pub fixes: Vec<FixEvent>,
    /// Watched entities dropped without a fix.
    pub dropped: Vec<DropEvent>,
    /// Final monitor state.
    pub report: MonitorReport,
}

impl ScenarioOutcome {
    fn new(name: &str, frames: u64) -> Self {
        Self {
            name: name.to_string(),
            frames,
            end_time: SimTime::ZERO,
            ticks_ran: 0,
            ticks_skipped: 0,
            scans: 0,
            fixes: Vec::new(),
            dropped: Vec::new(),
            report: MonitorReport::default(),
        }
    }

    fn record(&mut self, status: TickStatus) {
        if status == TickStatus::Ran {
            self.ticks_ran += 1;
        } else {
            self.ticks_skipped += 1;
        }
    }

    /// Fixes applied to `id`.
    pub fn fixes_for(&self, id: EntityId) -> impl Iterator<Item = &FixEvent> + '_ {
        self.fixes.iter().filter(move |fix| fix.entity == id)
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> WatchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::MonitoredEntity;

    const AIRBORNE_NPC: &str = r"
name: hover
duration: 8
timestep: 0.1
actors:
  - id: 1
    name: floater
    phases:
      - { at: 0, state: airborne }
";

    #[test]
    fn test_parse_minimal_scenario() {
        let scenario = Scenario::from_yaml(AIRBORNE_NPC).unwrap();
        assert_eq!(scenario.name, "hover");
        assert_eq!(scenario.actors.len(), 1);
        assert_eq!(scenario.actors[0].phases[0].state, ActorState::Airborne);
        assert!(scenario.monitor.is_none());
    }

    #[test]
    fn test_phase_time_units() {
        let yaml = r#"
name: units
duration: "2 s"
timestep: "50 ms"
actors:
  - id: 1
    name: a
    phases:
      - { at: "1500 ms", state: stuck }
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert!((scenario.timestep - 0.05).abs() < 1e-12);
        assert_eq!(scenario.actors[0].phases[0].at, SimTime::from_secs(1.5));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let yaml = r"
name: dup
duration: 1
actors:
  - { id: 1, name: a }
  - { id: 1, name: b }
";
        assert!(matches!(
            Scenario::from_yaml(yaml),
            Err(WatchError::Config { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_population() {
        let yaml = "name: empty\nduration: 1\nactors: []\n";
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, WatchError::Config { .. }));
        assert!(err.to_string().contains("no actors"));
    }

    #[test]
    fn test_rejects_two_privileged() {
        let yaml = r"
name: two
duration: 1
actors:
  - { id: 1, name: a, privileged: true }
  - { id: 2, name: b, privileged: true }
";
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_unknown_respawn_target() {
        let yaml = r"
name: ghost
duration: 1
actors:
  - { id: 1, name: a }
respawns:
  - { at: 0.5, id: 9 }
";
        assert!(matches!(
            Scenario::from_yaml(yaml),
            Err(WatchError::Config { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_name() {
        let yaml = "name: \"\"\nduration: 1\nactors:\n  - { id: 1, name: a }\n";
        assert!(matches!(
            Scenario::from_yaml(yaml),
            Err(WatchError::Validation(_))
        ));
    }

    #[test]
    fn test_airborne_npc_snapped_once() {
        let scenario = Scenario::from_yaml(AIRBORNE_NPC).unwrap();
        let outcome = scenario.run(&scenario.monitor_config()).unwrap();

        assert_eq!(outcome.fixes.len(), 1);
        let fix = outcome.fixes[0];
        assert_eq!(fix.entity, EntityId::new(1));
        assert_eq!(fix.problem, AnomalyKind::Airborne);
        assert_eq!(fix.remediation, RemediationKind::SnapToGround);
        // Dwell 4s, grace 1s, scans every 1.7s.
        assert!(fix.time > SimTime::from_secs(5.0));
        assert_eq!(outcome.ticks_skipped, 0);
    }

    #[test]
    fn test_detect_only_run_records_nothing() {
        let scenario = Scenario::from_yaml(AIRBORNE_NPC).unwrap();
        let config = WatchConfig::builder().detect_only(true).build();
        let outcome = scenario.run(&config).unwrap();

        assert!(outcome.fixes.is_empty());
        let entity = outcome.report.entity(EntityId::new(1)).unwrap();
        assert_eq!(entity.confirmed, AnomalyKind::Airborne);
        assert!(entity.watched);
    }

    #[test]
    fn test_pause_window_skips_ticks() {
        let yaml = r"
name: paused
duration: 2
timestep: 0.1
actors:
  - { id: 1, name: a }
pauses:
  - { from: 0.5, to: 1.0 }
";
        let scenario = Scenario::from_yaml(yaml).unwrap();
        let outcome = scenario.run(&WatchConfig::default()).unwrap();

        assert!(outcome.ticks_skipped >= 4);
        assert_eq!(outcome.ticks_ran + outcome.ticks_skipped, outcome.frames + 1);
        assert!(outcome.end_time < SimTime::from_secs(2.0));
    }

    #[test]
    fn test_respawn_resets_actor() {
        let mut actor = SandboxActor::new(EntityId::new(1), "a", Vec3::zero());
        actor.set_airborne(true);
        actor.deactivate();
        actor.respawn(Vec3::new(1.0, 0.0, 0.0));

        assert!(actor.is_active());
        assert!(actor.is_grounded());
        assert_eq!(actor.position(), Vec3::new(1.0, 0.0, 0.0));
    }
}
