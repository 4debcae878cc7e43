//! Entity health monitor.
//!
//! Keeps a [`TrackedEntity`] for every host entity and decides which ones
//! get looked at each tick:
//!
//! - the privileged entity is checked every tick, outside the watched set;
//! - entities in the watched set are checked every tick until fixed or
//!   deactivated;
//! - everyone else is only looked at by the periodic population scan,
//!   which promotes entities with a confirmed problem into the watched set.
//!
//! Removals from the watched set are collected during iteration and applied
//! after it completes.

pub mod history;
pub mod policy;
pub mod remediation;
pub mod report;
pub mod tracked;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::WatchConfig;
use crate::engine::SimTime;
use crate::error::WatchError;
use crate::host::{EntityId, MonitoredEntity, SimulationHost};

pub use history::{HistoryEntry, HistoryLog};
pub use policy::{AnomalyKind, ProblemPolicy, RemediationKind};
pub use remediation::{FixOutcome, NavigationSearch, TeleportOutcome};
pub use report::MonitorReport;
pub use tracked::{FixContext, SolvedSink, TrackedEntity};

/// Why a tick did or did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TickStatus {
    /// Full monitoring pass.
    Ran,
    /// Host is paused.
    SkippedPaused,
    /// Host is not in its play state.
    SkippedNotPlaying,
    /// Host clock reported a time before the previous tick.
    SkippedClockRewind,
}

/// What one call to [`Monitor::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    /// Host time of the tick.
    pub time: SimTime,
    /// Whether the pass ran.
    pub status: TickStatus,
    /// A population scan ran this tick.
    pub scanned: bool,
    /// Entities the scan added to the watched set.
    pub newly_watched: Vec<EntityId>,
    /// Entities that had a fix applied.
    pub fixed: Vec<EntityId>,
    /// Entities dropped from the watched set because they went inactive or
    /// disappeared from the host.
    pub dropped: Vec<EntityId>,
}

impl TickSummary {
    fn skipped(time: SimTime, status: TickStatus) -> Self {
        Self {
            time,
            status,
            scanned: false,
            newly_watched: Vec::new(),
            fixed: Vec::new(),
            dropped: Vec::new(),
        }
    }

    /// Whether the monitoring pass ran.
    #[must_use]
    pub fn ran(&self) -> bool {
        self.status == TickStatus::Ran
    }
}

/// The health monitor. One per monitored play session.
#[derive(Debug, Clone)]
pub struct Monitor {
    policy: ProblemPolicy,
    search: NavigationSearch,
    detect_only: bool,
    history_cap: usize,
    scan_interval: SimTime,

    entities: Vec<TrackedEntity>,
    index: HashMap<EntityId, usize>,
    privileged: Option<TrackedEntity>,
    watched: Vec<EntityId>,
    pending_removals: Vec<EntityId>,

    last_scan: Option<SimTime>,
    last_tick: Option<SimTime>,
}

impl Monitor {
    /// Create an unconfigured monitor. Call [`Monitor::configure`] before
    /// the first tick.
    #[must_use]
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            policy: ProblemPolicy::from_config(config),
            search: config.navigation_search(),
            detect_only: config.detect_only,
            history_cap: config.history_cap,
            scan_interval: SimTime::from_secs_saturating(config.scan.interval),
            entities: Vec::new(),
            index: HashMap::new(),
            privileged: None,
            watched: Vec::new(),
            pending_removals: Vec::new(),
            last_scan: None,
            last_tick: None,
        }
    }

    /// Create a monitor and configure it against `host` with a forced
    /// first scan.
    #[must_use]
    pub fn attach<H: SimulationHost>(config: &WatchConfig, host: &H) -> Self {
        let mut monitor = Self::new(config);
        monitor.configure(host, true);
        monitor
    }

    /// Rebuild the tracked population from `host`.
    ///
    /// Drops every tracked entity together with its history and empties the
    /// watched set. The privileged entity is tracked only in its own slot,
    /// which survives when the host still names the same privileged entity.
    /// `reset_search` makes the next tick run a forced scan.
    pub fn configure<H: SimulationHost>(&mut self, host: &H, reset_search: bool) {
        if reset_search {
            self.last_scan = None;
        }

        let privileged_id = host.privileged_id();
        let keep_privileged = matches!(
            (&self.privileged, privileged_id),
            (Some(current), Some(id)) if current.id() == id
        );
        if !keep_privileged {
            let cap = self.history_cap;
            self.privileged = privileged_id
                .and_then(|id| host.entity(id))
                .map(|entity| TrackedEntity::for_entity(entity, cap));
        }

        self.entities.clear();
        self.index.clear();
        self.watched.clear();
        self.pending_removals.clear();

        for id in host.entity_ids() {
            if Some(id) == privileged_id {
                continue;
            }
            if let Some(entity) = host.entity(id) {
                self.index.insert(id, self.entities.len());
                self.entities
                    .push(TrackedEntity::for_entity(entity, self.history_cap));
            }
        }

        info!(
            entities = self.entities.len(),
            privileged = ?self.privileged.as_ref().map(TrackedEntity::id),
            reset_search,
            "configured monitor"
        );
    }

    /// Run one monitoring pass.
    ///
    /// Skipped entirely while the host is paused or not playing, since dwell
    /// and grace windows assume continuously advancing time.
    pub fn tick<H: SimulationHost>(&mut self, host: &mut H) -> TickSummary {
        let now = host.now();

        if host.is_paused() {
            trace!(%now, "host paused, skipping tick");
            return TickSummary::skipped(now, TickStatus::SkippedPaused);
        }
        if !host.is_playing() {
            trace!(%now, "host not playing, skipping tick");
            return TickSummary::skipped(now, TickStatus::SkippedNotPlaying);
        }
        if let Some(last) = self.last_tick {
            if now < last {
                warn!(%now, %last, "host clock went backwards, skipping tick");
                return TickSummary::skipped(now, TickStatus::SkippedClockRewind);
            }
        }
        self.last_tick = Some(now);

        let mut summary = TickSummary::skipped(now, TickStatus::Ran);

        if let Some(newly) = self.scan_at(host, now, false) {
            summary.scanned = true;
            summary.newly_watched = newly;
        }

        let ctx = FixContext {
            policy: &self.policy,
            now,
            detect_only: self.detect_only,
            search: self.search,
        };

        // The privileged entity never enters the watched set, so its
        // solved notice has nowhere to go.
        if let Some(tracked) = self.privileged.as_mut() {
            let id = tracked.id();
            if let Some(entity) = host.entity_mut(id) {
                let mut solved: Vec<EntityId> = Vec::new();
                tracked.detect(entity, ctx.policy, now);
                tracked.maybe_fix(entity, &ctx, &mut solved);
                summary.fixed.extend(solved);
            } else {
                warn!(err = %WatchError::EntityNotFound(id), "privileged entity missing");
            }
        }

        self.pending_removals.clear();
        for &id in &self.watched {
            let Some(tracked) = self.index.get(&id).and_then(|&i| self.entities.get_mut(i))
            else {
                self.pending_removals.push(id);
                continue;
            };

            let Some(entity) = host.entity_mut(id) else {
                warn!(err = %WatchError::EntityNotFound(id), "dropping watched entity");
                tracked.reset();
                self.pending_removals.push(id);
                summary.dropped.push(id);
                continue;
            };

            if !entity.is_active() {
                debug!(entity = %id, name = entity.name(), "watched entity went inactive");
                tracked.reset();
                self.pending_removals.push(id);
                summary.dropped.push(id);
                continue;
            }

            let before = self.pending_removals.len();
            tracked.detect(entity, ctx.policy, now);
            tracked.maybe_fix(entity, &ctx, &mut self.pending_removals);
            summary
                .fixed
                .extend_from_slice(&self.pending_removals[before..]);
        }

        if !self.pending_removals.is_empty() {
            let pending = std::mem::take(&mut self.pending_removals);
            self.watched.retain(|id| !pending.contains(id));
            self.pending_removals = pending;
            self.pending_removals.clear();
        }

        summary
    }

    /// Scan the population for entities with a confirmed problem and add
    /// them to the watched set.
    ///
    /// Runs when `force` is set, on the first scan after (re)configuration,
    /// or once the scan interval has elapsed. Returns the newly watched
    /// entities, or `None` when the interval had not elapsed yet.
    pub fn scan<H: SimulationHost>(&mut self, host: &mut H, force: bool) -> Option<Vec<EntityId>> {
        let now = host.now();
        self.scan_at(host, now, force)
    }

    fn scan_at<H: SimulationHost>(
        &mut self,
        host: &mut H,
        now: SimTime,
        force: bool,
    ) -> Option<Vec<EntityId>> {
        let force = force || self.last_scan.is_none();
        if !force {
            if let Some(last) = self.last_scan {
                if now.since(last) < self.scan_interval {
                    return None;
                }
            }
        }

        let privileged_id = self.privileged.as_ref().map(TrackedEntity::id);
        let mut newly = Vec::new();

        for tracked in &mut self.entities {
            let id = tracked.id();
            if Some(id) == privileged_id || self.watched.contains(&id) {
                continue;
            }
            let Some(entity) = host.entity_mut(id) else {
                continue;
            };
            if entity.is_privileged() || !entity.is_active() {
                continue;
            }

            if tracked.detect(entity, &self.policy, now) {
                self.watched.push(id);
                newly.push(id);
            }
        }

        self.last_scan = Some(now);

        if !newly.is_empty() {
            info!(%now, added = newly.len(), watched = self.watched.len(), "scan found problems");
        }
        Some(newly)
    }

    /// Remove `id` from the watched set.
    ///
    /// Outside a tick nothing is iterating the set, so the removal is
    /// immediate. During a tick, fixes report through the deferred removal
    /// list instead.
    pub fn report_problem_solved(&mut self, id: EntityId) {
        self.watched.retain(|watched| *watched != id);
    }

    /// Clear transient state for `id` after the host reused that identity
    /// for a logically new entity. History is kept.
    ///
    /// Returns `false` if `id` is not tracked.
    pub fn reset_entity(&mut self, id: EntityId) -> bool {
        let mut found = false;
        if let Some(tracked) = self.index.get(&id).and_then(|&i| self.entities.get_mut(i)) {
            tracked.reset();
            found = true;
        }
        if let Some(tracked) = self.privileged.as_mut().filter(|t| t.id() == id) {
            tracked.reset();
            found = true;
        }
        if found {
            debug!(entity = %id, "reset tracked entity");
        }
        found
    }

    /// Toggle detect-only mode.
    pub fn set_detect_only(&mut self, detect_only: bool) {
        self.detect_only = detect_only;
    }

    /// Whether fixes are suppressed.
    #[must_use]
    pub const fn detect_only(&self) -> bool {
        self.detect_only
    }

    /// Tracking state for `id`, including the privileged slot.
    #[must_use]
    pub fn tracked(&self, id: EntityId) -> Option<&TrackedEntity> {
        if let Some(tracked) = self.privileged.as_ref().filter(|t| t.id() == id) {
            return Some(tracked);
        }
        self.index.get(&id).and_then(|&i| self.entities.get(i))
    }

    /// Fix history for `id`.
    #[must_use]
    pub fn history(&self, id: EntityId) -> Option<&HistoryLog> {
        self.tracked(id).map(TrackedEntity::history)
    }

    /// Privileged slot.
    #[must_use]
    pub const fn privileged(&self) -> Option<&TrackedEntity> {
        self.privileged.as_ref()
    }

    /// Tracked population in host order. The privileged entity lives in
    /// its own slot and is not part of it.
    #[must_use]
    pub fn entities(&self) -> &[TrackedEntity] {
        &self.entities
    }

    /// Number of tracked entities, excluding the privileged slot.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Watched entities, in the order they were added.
    #[must_use]
    pub fn watched_ids(&self) -> &[EntityId] {
        &self.watched
    }

    /// Whether `id` is in the watched set.
    #[must_use]
    pub fn is_watched(&self, id: EntityId) -> bool {
        self.watched.contains(&id)
    }

    /// Time of the last population scan, `None` before the first one.
    #[must_use]
    pub const fn last_scan(&self) -> Option<SimTime> {
        self.last_scan
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> &ProblemPolicy {
        &self.policy
    }

    /// Snapshot for diagnostics.
    #[must_use]
    pub fn report(&self) -> MonitorReport {
        MonitorReport::capture(self)
    }
}
