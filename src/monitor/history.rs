//! Bounded per-entity record of applied fixes.
//!
//! One entry per remediation event, kept so a developer can review what
//! went wrong and how it was corrected. Oldest entries are evicted first.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::engine::{SimTime, Vec3};
use crate::monitor::policy::{AnomalyKind, RemediationKind};

/// A single problem/fix event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    problem: AnomalyKind,
    previous_tentative: AnomalyKind,
    remediation: RemediationKind,
    time_first_suspected: Option<SimTime>,
    time_confirmed: Option<SimTime>,
    time_fixed: SimTime,
    position_at_first_suspicion: Option<Vec3>,
    position_before_fix: Vec3,
}

impl HistoryEntry {
    /// Record a fix.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub const fn new(
        problem: AnomalyKind,
        previous_tentative: AnomalyKind,
        remediation: RemediationKind,
        time_first_suspected: Option<SimTime>,
        time_confirmed: Option<SimTime>,
        time_fixed: SimTime,
        position_at_first_suspicion: Option<Vec3>,
        position_before_fix: Vec3,
    ) -> Self {
        Self {
            problem,
            previous_tentative,
            remediation,
            time_first_suspected,
            time_confirmed,
            time_fixed,
            position_at_first_suspicion,
            position_before_fix,
        }
    }

    /// The confirmed problem that was fixed.
    #[must_use]
    pub const fn problem(&self) -> AnomalyKind {
        self.problem
    }

    /// Tentative label seen just before the last suspicion. A value that
    /// differs from `problem` means the detection flip-flopped.
    #[must_use]
    pub const fn previous_tentative(&self) -> AnomalyKind {
        self.previous_tentative
    }

    /// Fix that was applied.
    #[must_use]
    pub const fn remediation(&self) -> RemediationKind {
        self.remediation
    }

    /// When the anomaly was first suspected.
    #[must_use]
    pub const fn time_first_suspected(&self) -> Option<SimTime> {
        self.time_first_suspected
    }

    /// When the anomaly was confirmed.
    #[must_use]
    pub const fn time_confirmed(&self) -> Option<SimTime> {
        self.time_confirmed
    }

    /// When the fix was applied.
    #[must_use]
    pub const fn time_fixed(&self) -> SimTime {
        self.time_fixed
    }

    /// Position recorded at the most recent suspicion.
    #[must_use]
    pub const fn position_at_first_suspicion(&self) -> Option<Vec3> {
        self.position_at_first_suspicion
    }

    /// Position just before the fix moved the entity.
    #[must_use]
    pub const fn position_before_fix(&self) -> Vec3 {
        self.position_before_fix
    }
}

/// FIFO of [`HistoryEntry`] capped at `cap` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    cap: usize,
}

impl HistoryLog {
    /// Create an empty log holding at most `cap` entries.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap.min(64)),
            cap,
        }
    }

    /// Append an entry, evicting the oldest ones beyond the cap.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, HistoryEntry> {
        self.entries.iter()
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept.
    #[must_use]
    pub const fn cap(&self) -> usize {
        self.cap
    }
}

impl<'a> IntoIterator for &'a HistoryLog {
    type Item = &'a HistoryEntry;
    type IntoIter = std::collections::vec_deque::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
pub(crate) fn entry_fixed_at(secs: f64) -> HistoryEntry {
    HistoryEntry::new(
        AnomalyKind::Airborne,
        AnomalyKind::None,
        RemediationKind::SnapToGround,
        Some(SimTime::ZERO),
        Some(SimTime::ZERO),
        SimTime::from_secs(secs),
        None,
        Vec3::zero(),
    )
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Falsification: after N pushes the log holds the last min(N, cap)
        /// entries in chronological order.
        #[test]
        fn prop_keeps_most_recent(cap in 1usize..20, pushes in 0usize..60) {
            let mut log = HistoryLog::new(cap);
            for i in 0..pushes {
                log.push(entry_fixed_at(i as f64));
            }

            prop_assert_eq!(log.len(), pushes.min(cap));
            let first_kept = pushes.saturating_sub(cap);
            for (offset, entry) in log.iter().enumerate() {
                prop_assert_eq!(entry.time_fixed(), SimTime::from_secs((first_kept + offset) as f64));
            }
        }
    }
}
