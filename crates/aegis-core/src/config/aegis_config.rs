//! Top-level Aegis configuration with layered resolution.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{RuleSetting, ScanConfig};
use crate::constants::PROJECT_CONFIG_FILE;
use crate::errors::ConfigError;
use crate::types::FailOn;

/// The configuration document.
///
/// ```toml
/// failOn = "warning"
/// excludePaths = ["vendor/**", "**/*.min.js"]
///
/// [rules.no-weak-crypto]
/// enabled = false
///
/// [rules.require-rate-limit]
/// severity = "info"
/// excludePaths = ["scripts/**"]
/// ```
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `CliOverrides`)
/// 2. Environment variables (`AEGIS_*`)
/// 3. Config file (`--config`, else `aegis.toml` at the scan root)
/// 4. Compiled defaults
///
/// Rule ids are not validated here; the resolver checks them against the
/// rule registry before any file is scanned.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AegisConfig {
    pub rules: BTreeMap<String, RuleSetting>,
    pub exclude_paths: Vec<String>,
    pub fail_on: Option<FailOn>,
    pub scan: ScanConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub fail_on: Option<FailOn>,
    pub threads: Option<usize>,
}

impl AegisConfig {
    /// Load configuration with layered resolution.
    ///
    /// `root` is the scan target; when it is a file its parent directory is
    /// searched for `aegis.toml`. An explicit `config_path` must exist.
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        cli_overrides: Option<&CliOverrides>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let dir = if root.is_file() {
                    root.parent().unwrap_or(root)
                } else {
                    root
                };
                let project = dir.join(PROJECT_CONFIG_FILE);
                if project.exists() {
                    Self::from_file(&project)?
                } else {
                    Self::default()
                }
            }
        };

        Self::apply_env_overrides(&mut config);

        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Read a config file, choosing JSON or TOML by extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            toml::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| ConfigError::ParseError {
            path: path.display().to_string(),
            message,
        })
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate value ranges. Rule ids are checked by the resolver.
    pub fn validate(config: &AegisConfig) -> Result<(), ConfigError> {
        if config.scan.max_file_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "scan.maxFileSize".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.scan.file_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "scan.fileTimeoutMs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.rules.keys().any(|id| id.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "rules".to_string(),
                message: "rule ids must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the effective fail-on level, defaulting to `error`.
    pub fn effective_fail_on(&self) -> FailOn {
        self.fail_on.unwrap_or_default()
    }

    /// Apply environment variable overrides.
    /// Pattern: `AEGIS_FAIL_ON`, `AEGIS_THREADS`, `AEGIS_MAX_FILE_SIZE`,
    /// `AEGIS_FILE_TIMEOUT_MS`. Unparseable values are ignored.
    fn apply_env_overrides(config: &mut AegisConfig) {
        if let Ok(val) = std::env::var("AEGIS_FAIL_ON") {
            match val.parse::<FailOn>() {
                Ok(v) => config.fail_on = Some(v),
                Err(e) => tracing::warn!(error = %e, "ignoring AEGIS_FAIL_ON"),
            }
        }
        if let Ok(val) = std::env::var("AEGIS_THREADS") {
            if let Ok(v) = val.parse::<usize>() {
                config.scan.threads = Some(v);
            }
        }
        if let Ok(val) = std::env::var("AEGIS_MAX_FILE_SIZE") {
            if let Ok(v) = val.parse::<u64>() {
                config.scan.max_file_size = Some(v);
            }
        }
        if let Ok(val) = std::env::var("AEGIS_FILE_TIMEOUT_MS") {
            if let Ok(v) = val.parse::<u64>() {
                config.scan.file_timeout_ms = Some(v);
            }
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut AegisConfig, cli: &CliOverrides) {
        if let Some(v) = cli.fail_on {
            config.fail_on = Some(v);
        }
        if let Some(v) = cli.threads {
            config.scan.threads = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}
