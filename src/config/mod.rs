//! Monitor configuration with YAML schema and validation.
//!
//! Every knob the monitor exposes lives here: scan cadence, dwell and
//! grace times per anomaly class, history depth, the detect-only debug
//! switch, and navigable-position search parameters.
//!
//! Durations accept either a bare number of seconds or a string with an
//! explicit unit (`"1.7 s"`, `"500 ms"`).

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use validator::Validate;

use crate::error::{WatchError, WatchResult};
use crate::monitor::remediation::NavigationSearch;

/// Top-level monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Schema version for forward compatibility.
    #[validate(length(min = 1))]
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Population scan settings.
    #[validate(nested)]
    #[serde(default)]
    pub scan: ScanConfig,

    /// Continuous time an anomaly must be seen before it is confirmed.
    #[validate(nested)]
    #[serde(default = "AnomalyDurations::default_dwell")]
    pub dwell: AnomalyDurations,

    /// Time a confirmed problem is tolerated before it is fixed.
    #[validate(nested)]
    #[serde(default = "AnomalyDurations::default_grace")]
    pub grace: AnomalyDurations,

    /// Fix records kept per entity.
    #[validate(range(min = 1, max = 10_000))]
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Detect and confirm problems but never fix them.
    #[serde(default)]
    pub detect_only: bool,

    /// Navigable-position search used by teleport fixes.
    #[validate(nested)]
    #[serde(default)]
    pub navigation: NavigationConfig,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

const fn default_history_cap() -> usize {
    10
}

impl WatchConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> WatchResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> WatchResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        config.validate_semantic()?;
        Ok(config)
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_yaml(&self) -> WatchResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Create a builder for configuration.
    #[must_use]
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder::default()
    }

    /// Validate constraints the schema cannot express.
    pub(crate) fn validate_semantic(&self) -> WatchResult<()> {
        if self.scan.interval <= 0.0 {
            return Err(WatchError::config("scan interval must be positive"));
        }

        // A scan only ever observes an entity once per interval, so an
        // interval past the shortest dwell still works but confirms late.
        let shortest_dwell = self.dwell.min();
        if shortest_dwell > 0.0 && self.scan.interval > shortest_dwell * 10.0 {
            return Err(WatchError::config(format!(
                "scan interval {}s is more than ten times the shortest dwell time {}s",
                self.scan.interval, shortest_dwell
            )));
        }

        Ok(())
    }

    /// Navigation search parameters.
    #[must_use]
    pub const fn navigation_search(&self) -> NavigationSearch {
        NavigationSearch {
            radius: self.navigation.search_radius,
            forward_distance: self.navigation.forward_distance,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            scan: ScanConfig::default(),
            dwell: AnomalyDurations::default_dwell(),
            grace: AnomalyDurations::default_grace(),
            history_cap: default_history_cap(),
            detect_only: false,
            navigation: NavigationConfig::default(),
        }
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct WatchConfigBuilder {
    scan_interval: Option<f64>,
    dwell: Option<AnomalyDurations>,
    grace: Option<AnomalyDurations>,
    history_cap: Option<usize>,
    detect_only: Option<bool>,
    navigation: Option<NavigationConfig>,
}

impl WatchConfigBuilder {
    /// Set the scan interval in seconds.
    #[must_use]
    pub const fn scan_interval(mut self, secs: f64) -> Self {
        self.scan_interval = Some(secs);
        self
    }

    /// Set dwell times.
    #[must_use]
    pub const fn dwell(mut self, dwell: AnomalyDurations) -> Self {
        self.dwell = Some(dwell);
        self
    }

    /// Set grace times.
    #[must_use]
    pub const fn grace(mut self, grace: AnomalyDurations) -> Self {
        self.grace = Some(grace);
        self
    }

    /// Set the per-entity history cap.
    #[must_use]
    pub const fn history_cap(mut self, cap: usize) -> Self {
        self.history_cap = Some(cap);
        self
    }

    /// Enable or disable detect-only mode.
    #[must_use]
    pub const fn detect_only(mut self, detect_only: bool) -> Self {
        self.detect_only = Some(detect_only);
        self
    }

    /// Set navigation search parameters.
    #[must_use]
    pub const fn navigation(mut self, navigation: NavigationConfig) -> Self {
        self.navigation = Some(navigation);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> WatchConfig {
        let mut config = WatchConfig::default();

        if let Some(interval) = self.scan_interval {
            config.scan.interval = interval;
        }
        if let Some(dwell) = self.dwell {
            config.dwell = dwell;
        }
        if let Some(grace) = self.grace {
            config.grace = grace;
        }
        if let Some(cap) = self.history_cap {
            config.history_cap = cap;
        }
        if let Some(detect_only) = self.detect_only {
            config.detect_only = detect_only;
        }
        if let Some(navigation) = self.navigation {
            config.navigation = navigation;
        }

        config
    }
}

/// Population scan settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Seconds between full-population scans.
    #[validate(range(min = 0.0, max = 3600.0))]
    #[serde(default = "default_scan_interval", deserialize_with = "seconds")]
    pub interval: f64,
}

const fn default_scan_interval() -> f64 {
    1.7
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval: default_scan_interval(),
        }
    }
}

/// One duration in seconds per anomaly class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AnomalyDurations {
    /// Movement input held without displacement.
    #[validate(range(min = 0.0, max = 3600.0))]
    #[serde(deserialize_with = "seconds")]
    pub input_without_movement: f64,
    /// Falling downwards.
    #[validate(range(min = 0.0, max = 3600.0))]
    #[serde(deserialize_with = "seconds")]
    pub falling: f64,
    /// Off the ground without falling.
    #[validate(range(min = 0.0, max = 3600.0))]
    #[serde(deserialize_with = "seconds")]
    pub airborne: f64,
}

impl AnomalyDurations {
    /// Same duration for every class.
    #[must_use]
    pub const fn uniform(secs: f64) -> Self {
        Self {
            input_without_movement: secs,
            falling: secs,
            airborne: secs,
        }
    }

    /// Default dwell times.
    ///
    /// Pressing into a wall is legitimate for a short while, so the stuck
    /// check is the shortest but not instant.
    #[must_use]
    pub const fn default_dwell() -> Self {
        Self {
            input_without_movement: 2.0,
            falling: 3.0,
            airborne: 4.0,
        }
    }

    /// Default grace times.
    #[must_use]
    pub const fn default_grace() -> Self {
        Self::uniform(1.0)
    }

    /// Shortest of the three durations.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.input_without_movement
            .min(self.falling)
            .min(self.airborne)
    }
}

/// Navigable-position search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NavigationConfig {
    /// Radius that must be clear around a teleport target.
    #[validate(range(min = 0.0, max = 1000.0))]
    #[serde(default = "default_search_radius")]
    pub search_radius: f64,
    /// Distance ahead a navigation path must be obtainable from the target.
    #[validate(range(min = 0.0, max = 1000.0))]
    #[serde(default = "default_forward_distance")]
    pub forward_distance: f64,
}

const fn default_search_radius() -> f64 {
    1.2
}

const fn default_forward_distance() -> f64 {
    1.0
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            search_radius: default_search_radius(),
            forward_distance: default_forward_distance(),
        }
    }
}

// =============================================================================
// Durations with optional explicit units
// =============================================================================

/// Accept `1.5` (seconds) or `"1500 ms"`.
pub(crate) fn seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(secs) => Ok(secs),
        Raw::Text(s) => parse_seconds(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "Invalid duration '{s}'. Expected a number of seconds or \
                 '<number> <unit>' where unit is 's', 'ms', or 'min'"
            ))
        }),
    }
}

/// Parse duration string with explicit units into seconds.
fn parse_seconds(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 2 {
        return None;
    }

    let value: f64 = parts[0].parse().ok()?;
    let unit = parts[1].to_lowercase();

    let seconds = match unit.as_str() {
        "s" | "sec" | "seconds" => value,
        "ms" | "milliseconds" => value / 1000.0,
        "min" | "minutes" => value * 60.0,
        _ => return None,
    };

    Some(seconds)
}
