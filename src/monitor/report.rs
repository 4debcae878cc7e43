//! Serializable monitor snapshot for diagnostics and CLI output.

use serde::Serialize;

use crate::engine::{SimTime, Vec3};
use crate::error::WatchResult;
use crate::host::EntityId;
use crate::monitor::history::HistoryEntry;
use crate::monitor::policy::AnomalyKind;
use crate::monitor::tracked::TrackedEntity;
use crate::monitor::Monitor;

/// State of one tracked entity at capture time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityReport {
    /// Identity.
    pub id: EntityId,
    /// Name captured when tracking started.
    pub name: String,
    /// Privileged slot.
    pub privileged: bool,
    /// In the watched set.
    pub watched: bool,
    /// Latest tentative label.
    pub tentative: AnomalyKind,
    /// Confirmed problem.
    pub confirmed: AnomalyKind,
    /// Start of the current episode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_first_suspected: Option<SimTime>,
    /// Confirmation time of the current problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_confirmed: Option<SimTime>,
    /// Position at the latest check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_last_checked: Option<Vec3>,
    /// Past fixes, oldest first.
    pub history: Vec<HistoryEntry>,
}

impl EntityReport {
    fn capture(tracked: &TrackedEntity, privileged: bool, watched: bool) -> Self {
        Self {
            id: tracked.id(),
            name: tracked.name().to_string(),
            privileged,
            watched,
            tentative: tracked.tentative(),
            confirmed: tracked.confirmed(),
            time_first_suspected: tracked.time_first_suspected(),
            time_confirmed: tracked.time_confirmed(),
            position_last_checked: tracked.position_last_checked(),
            history: tracked.history().iter().cloned().collect(),
        }
    }

    /// Number of recorded fixes.
    #[must_use]
    pub fn fix_count(&self) -> usize {
        self.history.len()
    }
}

/// Whole-monitor snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorReport {
    /// Time of the last population scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_scan: Option<SimTime>,
    /// Detect-only mode was on.
    pub detect_only: bool,
    /// Watched entities in insertion order.
    pub watched: Vec<EntityId>,
    /// Privileged slot first, then the population in host order.
    pub entities: Vec<EntityReport>,
}

impl MonitorReport {
    pub(crate) fn capture(monitor: &Monitor) -> Self {
        let mut entities: Vec<EntityReport> = monitor
            .privileged()
            .map(|tracked| EntityReport::capture(tracked, true, false))
            .into_iter()
            .collect();
        entities.extend(monitor.entities().iter().map(|tracked| {
            EntityReport::capture(tracked, false, monitor.is_watched(tracked.id()))
        }));

        Self {
            last_scan: monitor.last_scan(),
            detect_only: monitor.detect_only(),
            watched: monitor.watched_ids().to_vec(),
            entities,
        }
    }

    /// Entry for `id`.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&EntityReport> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    /// Fixes recorded across all entities.
    #[must_use]
    pub fn total_fixes(&self) -> usize {
        self.entities.iter().map(EntityReport::fix_count).sum()
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> WatchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize as YAML.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_yaml(&self) -> WatchResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
