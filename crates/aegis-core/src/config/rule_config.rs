//! Per-rule configuration.

use serde::{Deserialize, Serialize};

use crate::types::Severity;

/// User override for a single rule, keyed by rule id in `AegisConfig::rules`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleSetting {
    /// Enable or disable the rule. Default: enabled.
    pub enabled: Option<bool>,
    /// Severity override applied to every finding of the rule.
    pub severity: Option<Severity>,
    /// Globs (relative to the scan root) where this rule does not run.
    pub exclude_paths: Vec<String>,
}

impl RuleSetting {
    /// Returns the effective enabled flag, defaulting to true.
    pub fn effective_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}
