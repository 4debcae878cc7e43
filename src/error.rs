//! Error types for simwatch.
//!
//! Monitoring never aborts a tick: detection and remediation failures are
//! reported through these variants, logged, and isolated to the entity
//! whose turn produced them. Loading configuration or scenarios is the only
//! place errors propagate to the caller.

use thiserror::Error;

use crate::host::EntityId;
use crate::monitor::policy::{AnomalyKind, PolicyTable, RemediationKind};

/// Result type alias for simwatch operations.
pub type WatchResult<T> = Result<T, WatchError>;

/// Unified error type for all simwatch operations.
#[derive(Debug, Error)]
pub enum WatchError {
    // ===== Monitoring Errors =====
    /// A policy table has no entry for the given anomaly kind.
    #[error("no {table} configured for {kind:?}; it will never be acted on")]
    UnmappedProblem {
        /// The anomaly kind that was looked up.
        kind: AnomalyKind,
        /// Which table was consulted.
        table: PolicyTable,
    },

    /// A remediation kind reached dispatch without a handler.
    #[error("unknown remediation {remediation:?} for problem {problem:?}")]
    UnknownRemediation {
        /// The remediation that could not be dispatched.
        remediation: RemediationKind,
        /// The problem it was meant to fix.
        problem: AnomalyKind,
    },

    /// The host no longer resolves a tracked entity.
    #[error("entity {0} not found in host population")]
    EntityNotFound(EntityId),

    // ===== Configuration Errors =====
    /// Invalid configuration parameter.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== I/O Errors =====
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error belongs to a single entity's turn and must not
    /// stop the monitor.
    #[must_use]
    pub const fn is_entity_local(&self) -> bool {
        matches!(
            self,
            Self::UnmappedProblem { .. }
                | Self::UnknownRemediation { .. }
                | Self::EntityNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_local_classification() {
        let unmapped = WatchError::UnmappedProblem {
            kind: AnomalyKind::None,
            table: PolicyTable::GraceTime,
        };
        assert!(unmapped.is_entity_local());

        let unknown = WatchError::UnknownRemediation {
            remediation: RemediationKind::None,
            problem: AnomalyKind::Airborne,
        };
        assert!(unknown.is_entity_local());

        assert!(WatchError::EntityNotFound(EntityId::new(7)).is_entity_local());
        assert!(!WatchError::config("bad").is_entity_local());
    }

    #[test]
    fn test_unmapped_display() {
        let err = WatchError::UnmappedProblem {
            kind: AnomalyKind::None,
            table: PolicyTable::DwellTime,
        };
        let msg = err.to_string();
        assert!(msg.contains("dwell time"));
        assert!(msg.contains("None"));
        assert!(msg.contains("never"));
    }

    #[test]
    fn test_unknown_remediation_display() {
        let err = WatchError::UnknownRemediation {
            remediation: RemediationKind::None,
            problem: AnomalyKind::Falling,
        };
        let msg = err.to_string();
        assert!(msg.contains("unknown remediation"));
        assert!(msg.contains("Falling"));
    }

    #[test]
    fn test_entity_not_found_display() {
        let msg = WatchError::EntityNotFound(EntityId::new(42)).to_string();
        assert!(msg.contains("#42"));
    }

    #[test]
    fn test_error_config() {
        let err = WatchError::config("invalid parameter");
        let msg = err.to_string();
        assert!(msg.contains("Configuration error"));
        assert!(msg.contains("invalid parameter"));
    }

    #[test]
    fn test_error_io() {
        let err = WatchError::from(std::io::Error::other("file not found"));
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_error_debug() {
        let err = WatchError::config("test");
        let debug = format!("{err:?}");
        assert!(debug.contains("Config"));
    }
}
