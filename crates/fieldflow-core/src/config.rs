//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the workflow state attribute when a record type does not set one.
pub const DEFAULT_STATE_FIELD: &str = "state";

/// What to do when a getter omits some of the requested records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Report the missing records as `Value::Null`.
    #[default]
    FillNull,
    /// Fail with `Error::IncompleteGetterResult`.
    Error,
}

/// Configuration shared by every record type in a registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// State attribute used by record types that do not name their own.
    pub default_state_field: String,

    /// Fail guarded transitions that include inadmissible records instead of
    /// skipping them.
    pub strict_transitions: bool,

    /// Handling of incomplete getter results.
    pub missing_values: MissingValuePolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_state_field: DEFAULT_STATE_FIELD.to_string(),
            strict_transitions: false,
            missing_values: MissingValuePolicy::FillNull,
        }
    }
}

impl CoreConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the default state attribute name.
    pub fn state_field(mut self, name: impl Into<String>) -> Self {
        self.default_state_field = name.into();
        self
    }

    /// Set strict transition mode.
    pub fn strict_transitions(mut self, strict: bool) -> Self {
        self.strict_transitions = strict;
        self
    }

    /// Set the missing value policy.
    pub fn missing_values(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_values = policy;
        self
    }

    /// Guard configuration derived from this configuration.
    pub fn guard(&self) -> GuardConfig {
        GuardConfig {
            strict: self.strict_transitions,
        }
    }
}

/// Per-guard configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardConfig {
    /// Fail when any record cannot reach the target state.
    pub strict: bool,
}

impl GuardConfig {
    /// Skip inadmissible records silently.
    pub fn lenient() -> Self {
        Self { strict: false }
    }

    /// Reject batches containing inadmissible records.
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.default_state_field, "state");
        assert!(!config.strict_transitions);
        assert_eq!(config.missing_values, MissingValuePolicy::FillNull);
        assert!(!config.guard().strict);
    }

    #[test]
    fn test_builder() {
        let config = CoreConfig::default()
            .state_field("status")
            .strict_transitions(true)
            .missing_values(MissingValuePolicy::Error);
        assert_eq!(config.default_state_field, "status");
        assert!(config.guard().strict);
    }

    #[test]
    fn test_from_json_partial() {
        let config = CoreConfig::from_json(r#"{"strict_transitions": true}"#).unwrap();
        assert!(config.strict_transitions);
        assert_eq!(config.default_state_field, "state");

        let config = CoreConfig::from_json(r#"{"missing_values": "error"}"#).unwrap();
        assert_eq!(config.missing_values, MissingValuePolicy::Error);

        assert!(CoreConfig::from_json(r#"{"missing_values": "ignore"}"#).is_err());
    }
}
