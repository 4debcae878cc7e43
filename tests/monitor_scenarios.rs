//! End-to-end monitor behaviour against the sandbox host.
//!
//! Each test drives a `SandboxWorld` tick by tick and checks what the
//! monitor observed and which actuators it called.

use simwatch::prelude::*;

const STEP: f64 = 0.1;

fn secs(s: f64) -> SimTime {
    SimTime::from_secs(s)
}

fn npc(id: u64) -> SandboxActor {
    SandboxActor::new(EntityId::new(id), format!("npc-{id}"), Vec3::new(id as f64, 0.0, 0.0))
}

fn hero() -> SandboxActor {
    let mut actor = SandboxActor::new(EntityId::new(0), "hero", Vec3::zero());
    actor.set_privileged(true);
    actor
}

fn world_with(actors: Vec<SandboxActor>) -> SandboxWorld {
    let mut world = SandboxWorld::new(STEP);
    for actor in actors {
        world.add_actor(actor);
    }
    world
}

/// Step and tick until the world clock reaches `target`.
fn advance_to(monitor: &mut Monitor, world: &mut SandboxWorld, target: f64) -> Vec<TickSummary> {
    let target = secs(target);
    let mut summaries = Vec::new();
    while world.now() < target {
        world.step();
        summaries.push(monitor.tick(world));
    }
    summaries
}

fn snaps(world: &SandboxWorld, id: u64) -> u32 {
    world.actor(EntityId::new(id)).map_or(0, SandboxActor::snap_count)
}

/// Airborne past dwell is confirmed; past grace it is snapped exactly once
/// and leaves the watched set.
#[test]
fn airborne_entity_confirmed_then_snapped_once() {
    let config = WatchConfig::builder().scan_interval(STEP).build();
    let mut floater = npc(1);
    floater.set_airborne(true);
    let mut world = world_with(vec![floater]);
    let mut monitor = Monitor::attach(&config, &world);
    let id = EntityId::new(1);

    monitor.tick(&mut world);
    advance_to(&mut monitor, &mut world, 3.9);
    assert!(!monitor.is_watched(id));

    advance_to(&mut monitor, &mut world, 4.0);
    assert!(monitor.is_watched(id));
    let tracked = monitor.tracked(id).unwrap();
    assert_eq!(tracked.confirmed(), AnomalyKind::Airborne);
    assert_eq!(tracked.time_confirmed(), Some(secs(4.0)));

    // Exactly at grace: still waiting.
    advance_to(&mut monitor, &mut world, 5.0);
    assert_eq!(snaps(&world, 1), 0);

    let summaries = advance_to(&mut monitor, &mut world, 5.1);
    assert_eq!(summaries.last().unwrap().fixed, vec![id]);
    assert_eq!(snaps(&world, 1), 1);
    assert!(!monitor.is_watched(id));

    advance_to(&mut monitor, &mut world, 20.0);
    assert_eq!(snaps(&world, 1), 1);
    let entry = monitor.history(id).unwrap().latest().unwrap();
    assert_eq!(entry.remediation(), RemediationKind::SnapToGround);
    assert_eq!(entry.time_fixed(), SimTime::from_nanos(51 * 100_000_000));
}

/// A single grounded tick just before dwell elapses discards all progress.
#[test]
fn grounded_tick_resets_dwell() {
    let config = WatchConfig::builder().scan_interval(STEP).build();
    let mut world = world_with(vec![npc(1)]);
    let mut monitor = Monitor::attach(&config, &world);
    let id = EntityId::new(1);

    monitor.tick(&mut world);
    for _ in 0..3 {
        world.actor_mut(id).unwrap().set_airborne(true);
        for _ in 0..39 {
            world.step();
            monitor.tick(&mut world);
            assert!(!monitor.tracked(id).unwrap().has_problem());
        }
        world.actor_mut(id).unwrap().set_airborne(false);
        world.step();
        monitor.tick(&mut world);
        assert_eq!(monitor.tracked(id).unwrap().tentative(), AnomalyKind::None);
    }

    assert!(monitor.watched_ids().is_empty());
    assert_eq!(snaps(&world, 1), 0);
    assert!(monitor.history(id).unwrap().is_empty());
}

/// The privileged entity is checked every tick outside the watched set,
/// so it is fixed between scans.
#[test]
fn privileged_entity_fixed_without_scans() {
    let config = WatchConfig::builder()
        .scan_interval(30.0)
        .dwell(AnomalyDurations::uniform(0.5))
        .grace(AnomalyDurations::uniform(0.2))
        .build();
    let mut world = world_with(vec![hero(), npc(1)]);
    let mut monitor = Monitor::attach(&config, &world);
    let id = EntityId::new(0);

    monitor.tick(&mut world);
    let mut fixes = 0;
    for round in 0..5 {
        world.actor_mut(id).unwrap().set_airborne(true);
        let summaries = advance_to(&mut monitor, &mut world, f64::from(round + 1) * 2.0);
        assert!(summaries.iter().all(|s| !s.scanned));
        assert!(summaries.iter().all(|s| s.newly_watched.is_empty()));
        assert!(!monitor.is_watched(id));
        fixes += summaries.iter().filter(|s| s.fixed.contains(&id)).count();
    }

    assert_eq!(fixes, 5);
    assert_eq!(snaps(&world, 0), 5);
    assert_eq!(monitor.history(id).unwrap().len(), 5);
    assert!(monitor.watched_ids().is_empty());
}

/// Detect-only: the problem stays confirmed forever and nothing is done.
#[test]
fn detect_only_never_remediates() {
    let config = WatchConfig::builder().detect_only(true).build();
    let mut floater = npc(1);
    floater.set_airborne(true);
    let mut stuck = hero();
    stuck.set_player_input(Vec2::new(1.0, 0.0));
    stuck.set_navigable_point(Some(Vec3::new(9.0, 0.0, 9.0)));
    let mut world = world_with(vec![stuck, floater]);
    let mut monitor = Monitor::attach(&config, &world);

    monitor.tick(&mut world);
    let summaries = advance_to(&mut monitor, &mut world, 60.0);

    assert!(summaries.iter().all(|s| s.fixed.is_empty()));
    assert!(monitor.is_watched(EntityId::new(1)));
    assert_eq!(
        monitor.tracked(EntityId::new(1)).unwrap().confirmed(),
        AnomalyKind::Airborne
    );
    assert_eq!(
        monitor.privileged().unwrap().confirmed(),
        AnomalyKind::InputWithoutMovement
    );
    assert_eq!(snaps(&world, 1), 0);
    assert_eq!(world.actor(EntityId::new(0)).unwrap().teleport_count(), 0);
    assert!(monitor.history(EntityId::new(0)).unwrap().is_empty());
    assert!(monitor.history(EntityId::new(1)).unwrap().is_empty());
}

/// Turning detect-only off lets the pending fix through on the next tick.
#[test]
fn leaving_detect_only_applies_overdue_fix() {
    let config = WatchConfig::builder()
        .detect_only(true)
        .scan_interval(STEP)
        .build();
    let mut floater = npc(1);
    floater.set_airborne(true);
    let mut world = world_with(vec![floater]);
    let mut monitor = Monitor::attach(&config, &world);

    monitor.tick(&mut world);
    advance_to(&mut monitor, &mut world, 10.0);
    assert_eq!(snaps(&world, 1), 0);

    monitor.set_detect_only(false);
    advance_to(&mut monitor, &mut world, 10.1);
    assert_eq!(snaps(&world, 1), 1);
}

/// Several watched entities fixed in the same tick are all removed after
/// the pass, and every one of them was processed.
#[test]
fn simultaneous_fixes_all_removed() {
    let config = WatchConfig::builder()
        .scan_interval(1.0)
        .dwell(AnomalyDurations::uniform(1.0))
        .grace(AnomalyDurations::uniform(0.5))
        .build();
    let actors: Vec<_> = (1..=6)
        .map(|id| {
            let mut actor = npc(id);
            actor.set_airborne(true);
            actor
        })
        .collect();
    let mut world = world_with(actors);
    let mut monitor = Monitor::attach(&config, &world);

    monitor.tick(&mut world);
    let summaries = advance_to(&mut monitor, &mut world, 1.0);
    assert_eq!(monitor.watched_ids().len(), 6);
    assert_eq!(summaries.last().unwrap().newly_watched.len(), 6);

    let summaries = advance_to(&mut monitor, &mut world, 1.6);
    let fixed = &summaries.last().unwrap().fixed;
    assert_eq!(fixed.len(), 6);
    assert!(monitor.watched_ids().is_empty());
    for id in 1..=6 {
        assert_eq!(snaps(&world, id), 1);
    }
}

/// A fix and a deactivation in the same pass do not disturb each other.
#[test]
fn fix_and_deactivation_in_same_tick() {
    let config = WatchConfig::builder()
        .scan_interval(STEP)
        .dwell(AnomalyDurations::uniform(0.0))
        .grace(AnomalyDurations::uniform(0.05))
        .build();
    let mut a = npc(1);
    a.set_airborne(true);
    let mut b = npc(2);
    b.set_airborne(true);
    let mut c = npc(3);
    c.set_airborne(true);
    let mut world = world_with(vec![a, b, c]);
    let mut monitor = Monitor::attach(&config, &world);

    monitor.tick(&mut world);
    assert_eq!(monitor.watched_ids().len(), 3);

    world.actor_mut(EntityId::new(2)).unwrap().deactivate();
    world.step();
    let summary = monitor.tick(&mut world);

    assert_eq!(summary.dropped, vec![EntityId::new(2)]);
    assert_eq!(summary.fixed, vec![EntityId::new(1), EntityId::new(3)]);
    assert!(monitor.watched_ids().is_empty());
    assert_eq!(snaps(&world, 2), 0);
}

/// A watched entity that disappears from the host is dropped.
#[test]
fn vanished_entity_dropped() {
    let config = WatchConfig::builder()
        .dwell(AnomalyDurations::uniform(0.0))
        .grace(AnomalyDurations::uniform(100.0))
        .build();
    let mut floater = npc(1);
    floater.set_airborne(true);
    let mut world = world_with(vec![floater, npc(2)]);
    let mut monitor = Monitor::attach(&config, &world);

    monitor.tick(&mut world);
    assert!(monitor.is_watched(EntityId::new(1)));

    world.remove_actor(EntityId::new(1));
    world.step();
    let summary = monitor.tick(&mut world);
    assert!(summary.ran());
    assert_eq!(summary.dropped, vec![EntityId::new(1)]);
    assert!(!monitor.is_watched(EntityId::new(1)));
}

/// Falling wins over airborne and gets a teleport, not a snap.
#[test]
fn falling_entity_teleported() {
    let config = WatchConfig::builder().scan_interval(STEP).build();
    let mut faller = npc(1);
    faller.set_falling(true);
    let landing = Vec3::new(1.0, 0.0, 3.0);
    faller.set_navigable_point(Some(landing));
    let mut world = world_with(vec![faller]);
    let mut monitor = Monitor::attach(&config, &world);

    monitor.tick(&mut world);
    advance_to(&mut monitor, &mut world, 5.0);

    let entry = monitor.history(EntityId::new(1)).unwrap().latest().unwrap();
    assert_eq!(entry.problem(), AnomalyKind::Falling);
    assert_eq!(entry.remediation(), RemediationKind::TeleportToSafeGround);
    let actor = world.actor(EntityId::new(1)).unwrap();
    assert_eq!(actor.position(), landing);
    assert_eq!(actor.snap_count(), 0);
}

/// An NPC with nowhere to go is deactivated and never watched again.
#[test]
fn stranded_npc_deactivated() {
    let config = WatchConfig::builder()
        .scan_interval(STEP)
        .dwell(AnomalyDurations::uniform(0.2))
        .grace(AnomalyDurations::uniform(0.1))
        .build();
    let mut faller = npc(1);
    faller.set_falling(true);
    let mut world = world_with(vec![faller]);
    let mut monitor = Monitor::attach(&config, &world);

    monitor.tick(&mut world);
    advance_to(&mut monitor, &mut world, 3.0);

    let actor = world.actor(EntityId::new(1)).unwrap();
    assert!(!actor.is_active());
    assert_eq!(actor.deactivate_count(), 1);
    assert_eq!(monitor.history(EntityId::new(1)).unwrap().len(), 1);
    assert!(monitor.watched_ids().is_empty());
}

/// Paused ticks do not count towards dwell.
#[test]
fn pause_freezes_monitoring() {
    let config = WatchConfig::builder().scan_interval(STEP).build();
    let mut floater = npc(1);
    floater.set_airborne(true);
    let mut world = world_with(vec![floater]);
    let mut monitor = Monitor::attach(&config, &world);

    monitor.tick(&mut world);
    advance_to(&mut monitor, &mut world, 2.0);

    world.set_paused(true);
    for _ in 0..100 {
        world.step();
        let summary = monitor.tick(&mut world);
        assert_eq!(summary.status, TickStatus::SkippedPaused);
    }
    assert!(!monitor.tracked(EntityId::new(1)).unwrap().has_problem());

    world.set_paused(false);
    advance_to(&mut monitor, &mut world, 4.0);
    assert!(monitor.tracked(EntityId::new(1)).unwrap().has_problem());
}

/// Reusing an identity resets transient state but keeps the fix record.
#[test]
fn reset_entity_after_identity_reuse() {
    let config = WatchConfig::builder()
        .scan_interval(STEP)
        .dwell(AnomalyDurations::uniform(0.0))
        .grace(AnomalyDurations::uniform(0.0))
        .build();
    let mut floater = npc(1);
    floater.set_airborne(true);
    let mut world = world_with(vec![floater]);
    let mut monitor = Monitor::attach(&config, &world);
    let id = EntityId::new(1);

    monitor.tick(&mut world);
    advance_to(&mut monitor, &mut world, 0.5);
    assert_eq!(monitor.history(id).unwrap().len(), 1);

    world.actor_mut(id).unwrap().set_airborne(true);
    advance_to(&mut monitor, &mut world, 0.6);
    assert!(monitor.tracked(id).unwrap().tentative().is_some());

    world.actor_mut(id).unwrap().respawn(Vec3::new(5.0, 0.0, 5.0));
    assert!(monitor.reset_entity(id));
    let tracked = monitor.tracked(id).unwrap();
    assert_eq!(tracked.tentative(), AnomalyKind::None);
    assert_eq!(tracked.time_first_suspected(), None);
    assert_eq!(monitor.history(id).unwrap().len(), 1);
}

// ============================================================================
// Shipped scenario files
// ============================================================================

fn shipped(name: &str) -> Scenario {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name);
    Scenario::load(path).unwrap()
}

#[test]
fn shipped_stuck_player_is_teleported() {
    let scenario = shipped("stuck_player.yaml");
    let outcome = scenario.run(&scenario.monitor_config()).unwrap();

    let fixes: Vec<_> = outcome.fixes_for(EntityId::new(0)).collect();
    assert!(!fixes.is_empty());
    assert_eq!(fixes[0].problem, AnomalyKind::InputWithoutMovement);
    assert!(fixes[0].time > secs(4.0));
    assert!(outcome.fixes_for(EntityId::new(1)).next().is_none());
}

#[test]
fn shipped_crowd_runs_with_pause() {
    let scenario = shipped("crowd.yaml");
    let outcome = scenario.run(&scenario.monitor_config()).unwrap();

    assert!(outcome.ticks_skipped > 0);
    assert!(outcome
        .fixes_for(EntityId::new(1))
        .any(|fix| fix.problem == AnomalyKind::Airborne));
}

#[test]
fn shipped_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("simwatch.yaml");
    let config = WatchConfig::load(path).unwrap();
    assert!(!config.detect_only);
    assert_eq!(config.history_cap, 10);
}
