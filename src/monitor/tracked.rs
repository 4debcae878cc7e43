//! Per-entity detection, confirmation and remediation state machine.
//!
//! ```text
//!            anomaly seen             dwell elapsed            grace elapsed
//!   clean ───────────────▶ tentative ──────────────▶ confirmed ─────────────▶ fixed
//!     ▲                       │                          │                      │
//!     └──── clean tick ───────┴──────── clean tick ──────┘◀──── full reset ─────┘
//! ```
//!
//! A single tick without any anomaly discards all accumulated dwell
//! progress. Anomalies have to be observed on every check to count.

use serde::Serialize;
use tracing::{debug, error, info, trace};

use crate::engine::{SimTime, Vec3};
use crate::host::{EntityId, MonitoredEntity};
use crate::monitor::history::{HistoryEntry, HistoryLog};
use crate::monitor::policy::{AnomalyKind, ProblemPolicy, RemediationKind};
use crate::monitor::remediation::{self, FixOutcome, NavigationSearch};

/// Receiver for "this entity's problem is solved" notifications.
///
/// Implementations must defer any removal from a collection that is
/// currently being iterated.
pub trait SolvedSink {
    /// Record that `id` no longer needs per-tick checks.
    fn report_problem_solved(&mut self, id: EntityId);
}

impl SolvedSink for Vec<EntityId> {
    fn report_problem_solved(&mut self, id: EntityId) {
        self.push(id);
    }
}

/// Everything a remediation step needs besides the entity itself.
#[derive(Debug, Clone, Copy)]
pub struct FixContext<'a> {
    /// Dwell/grace tables.
    pub policy: &'a ProblemPolicy,
    /// Current simulation time.
    pub now: SimTime,
    /// Detect problems but never act on them.
    pub detect_only: bool,
    /// Navigable-position search parameters.
    pub search: NavigationSearch,
}

/// Monitoring state for one host entity.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedEntity {
    id: EntityId,
    name: String,
    tentative: AnomalyKind,
    tentative_previous: AnomalyKind,
    confirmed: AnomalyKind,
    time_first_suspected: Option<SimTime>,
    time_confirmed: Option<SimTime>,
    ground_distance: f64,
    position_at_first_suspicion: Option<Vec3>,
    position_last_checked: Option<Vec3>,
    history: HistoryLog,
}

impl TrackedEntity {
    /// Start tracking an entity with a history of at most `history_cap`.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, history_cap: usize) -> Self {
        Self {
            id,
            name: name.into(),
            tentative: AnomalyKind::None,
            tentative_previous: AnomalyKind::None,
            confirmed: AnomalyKind::None,
            time_first_suspected: None,
            time_confirmed: None,
            ground_distance: f64::INFINITY,
            position_at_first_suspicion: None,
            position_last_checked: None,
            history: HistoryLog::new(history_cap),
        }
    }

    /// Start tracking `entity`.
    #[must_use]
    pub fn for_entity<E: MonitoredEntity + ?Sized>(entity: &E, history_cap: usize) -> Self {
        Self::new(entity.id(), entity.name(), history_cap)
    }

    /// Identity of the tracked entity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Name captured when tracking started.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Anomaly seen on the latest check.
    #[must_use]
    pub const fn tentative(&self) -> AnomalyKind {
        self.tentative
    }

    /// Tentative label before the latest one.
    #[must_use]
    pub const fn tentative_previous(&self) -> AnomalyKind {
        self.tentative_previous
    }

    /// Confirmed problem, `None` if there is none.
    #[must_use]
    pub const fn confirmed(&self) -> AnomalyKind {
        self.confirmed
    }

    /// Whether a confirmed problem is active.
    #[must_use]
    pub const fn has_problem(&self) -> bool {
        self.confirmed.is_some()
    }

    /// When the current episode was first suspected.
    #[must_use]
    pub const fn time_first_suspected(&self) -> Option<SimTime> {
        self.time_first_suspected
    }

    /// When the current problem was confirmed.
    #[must_use]
    pub const fn time_confirmed(&self) -> Option<SimTime> {
        self.time_confirmed
    }

    /// Last measured distance to standable ground.
    #[must_use]
    pub const fn ground_distance(&self) -> f64 {
        self.ground_distance
    }

    /// Position at the latest suspicion.
    #[must_use]
    pub const fn position_at_first_suspicion(&self) -> Option<Vec3> {
        self.position_at_first_suspicion
    }

    /// Position at the previous check.
    #[must_use]
    pub const fn position_last_checked(&self) -> Option<Vec3> {
        self.position_last_checked
    }

    /// Past fixes.
    #[must_use]
    pub const fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Clear all transient state. History is kept.
    pub fn reset(&mut self) {
        self.tentative = AnomalyKind::None;
        self.tentative_previous = AnomalyKind::None;
        self.confirmed = AnomalyKind::None;
        self.time_first_suspected = None;
        self.time_confirmed = None;
        self.ground_distance = f64::INFINITY;
        self.position_at_first_suspicion = None;
        self.position_last_checked = None;
    }

    /// Inspect `entity` and advance the tentative/confirmed state.
    ///
    /// Returns whether a confirmed problem is active.
    pub fn detect<E>(&mut self, entity: &mut E, policy: &ProblemPolicy, now: SimTime) -> bool
    where
        E: MonitoredEntity + ?Sized,
    {
        // Also refreshes the host's grounded flag read below.
        self.ground_distance = entity.ground_distance();

        let position = entity.position();
        let found = self.probe(entity, position);

        if found.is_none() {
            self.reset();
        } else {
            self.suspect(found, position, now);
            self.maybe_confirm(policy, now);
        }

        // Must come after `probe`, which compares against the previous value.
        self.position_last_checked = Some(position);

        self.has_problem()
    }

    /// Anomaly probes in escalation order; first match wins.
    fn probe<E>(&self, entity: &E, position: Vec3) -> AnomalyKind
    where
        E: MonitoredEntity + ?Sized,
    {
        let falling = entity.is_falling_status() && entity.is_descending_vertically();
        if falling {
            return AnomalyKind::Falling;
        }
        if !entity.is_grounded() {
            return AnomalyKind::Airborne;
        }

        let unmoved = [self.position_at_first_suspicion, self.position_last_checked]
            .into_iter()
            .flatten()
            .any(|p| p.approx_eq(&position));
        if unmoved && entity.movement_input().has_non_zero_movement_input() {
            return AnomalyKind::InputWithoutMovement;
        }

        AnomalyKind::None
    }

    fn suspect(&mut self, kind: AnomalyKind, position: Vec3, now: SimTime) {
        self.tentative_previous = self.tentative;
        self.tentative = kind;
        if self.time_first_suspected.is_none() {
            self.time_first_suspected = Some(now);
        }
        self.position_at_first_suspicion = Some(position);

        debug!(
            entity = %self.id,
            name = %self.name,
            tentative = ?self.tentative,
            previous = ?self.tentative_previous,
            "suspected problem"
        );
    }

    fn maybe_confirm(&mut self, policy: &ProblemPolicy, now: SimTime) {
        let dwell = match policy.dwell_time(self.tentative) {
            Ok(dwell) => dwell,
            Err(err) => {
                error!(entity = %self.id, name = %self.name, %err, "cannot confirm problem");
                return;
            }
        };
        let Some(first) = self.time_first_suspected else {
            return;
        };
        if now.since(first) < dwell {
            return;
        }

        let newly = self.confirmed != self.tentative;
        self.confirmed = self.tentative;
        if self.time_confirmed.is_none() {
            self.time_confirmed = Some(now);
        }
        if newly {
            info!(
                entity = %self.id,
                name = %self.name,
                problem = ?self.confirmed,
                previous = ?self.tentative_previous,
                history = self.history.len(),
                "confirmed problem"
            );
        }
    }

    /// Apply the configured fix once the grace time after confirmation has
    /// passed.
    ///
    /// Returns whether a problem is still active afterwards. Does nothing
    /// and returns `false` when no problem is confirmed.
    pub fn maybe_fix<E, S>(&mut self, entity: &mut E, ctx: &FixContext<'_>, solved: &mut S) -> bool
    where
        E: MonitoredEntity + ?Sized,
        S: SolvedSink + ?Sized,
    {
        if !self.has_problem() {
            return false;
        }

        let grace = match ctx.policy.grace_time(self.confirmed) {
            Ok(grace) => grace,
            Err(err) => {
                error!(entity = %self.id, name = %self.name, %err, "problem will never be fixed");
                return true;
            }
        };
        let elapsed = self
            .time_confirmed
            .map_or(SimTime::ZERO, |confirmed| ctx.now.since(confirmed));

        trace!(entity = %self.id, %elapsed, %grace, "grace check");

        if elapsed > grace {
            match ProblemPolicy::remediation_for(self.confirmed) {
                Ok(remediation) => {
                    self.apply_fix(entity, remediation, ctx, solved);
                }
                Err(err) => {
                    error!(entity = %self.id, name = %self.name, %err, "no remediation");
                }
            }
        }

        self.has_problem()
    }

    /// Run `remediation` now, record it, notify `solved`, and reset.
    ///
    /// Returns the outcome when a fix was applied. In detect-only mode, or
    /// when the remediation cannot be dispatched, nothing changes.
    pub fn apply_fix<E, S>(
        &mut self,
        entity: &mut E,
        remediation: RemediationKind,
        ctx: &FixContext<'_>,
        solved: &mut S,
    ) -> Option<FixOutcome>
    where
        E: MonitoredEntity + ?Sized,
        S: SolvedSink + ?Sized,
    {
        if !self.has_problem() {
            return None;
        }

        if ctx.detect_only {
            info!(
                entity = %self.id,
                name = %self.name,
                problem = ?self.confirmed,
                ?remediation,
                "detect-only: problem due for fix, not fixing"
            );
            return None;
        }

        let position_before_fix = entity.position();

        let outcome =
            match remediation::dispatch(entity, remediation, self.confirmed, ctx.search) {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(entity = %self.id, name = %self.name, %err, "fix not applied");
                    return None;
                }
            };

        info!(
            entity = %self.id,
            name = %self.name,
            problem = ?self.confirmed,
            ?remediation,
            ?outcome,
            from = %position_before_fix,
            "applied fix"
        );

        self.history.push(HistoryEntry::new(
            self.confirmed,
            self.tentative_previous,
            remediation,
            self.time_first_suspected,
            self.time_confirmed,
            ctx.now,
            self.position_at_first_suspicion,
            position_before_fix,
        ));

        solved.report_problem_solved(self.id);
        self.reset();

        Some(outcome)
    }
}
