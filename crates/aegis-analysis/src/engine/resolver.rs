//! Configuration resolver: validates rule ids against the registry, compiles
//! exclusion globs once, and answers per-file questions during the scan.

use globset::{Glob, GlobSet, GlobSetBuilder};

use aegis_core::config::AegisConfig;
use aegis_core::errors::ConfigError;
use aegis_core::types::{FailOn, Severity};

use crate::rules::RuleRegistry;

/// Settings of one rule after merging defaults with overrides.
#[derive(Debug, Clone)]
pub struct ResolvedRule {
    pub enabled: bool,
    pub severity_override: Option<Severity>,
    exclude: Option<GlobSet>,
}

/// Immutable configuration for one scan, indexed like the registry.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    rules: Vec<ResolvedRule>,
    exclude: Option<GlobSet>,
    pub fail_on: FailOn,
    pub threads: usize,
    pub max_file_size: u64,
    pub file_timeout_ms: u64,
}

fn compile_globs(patterns: &[String]) -> Result<Option<GlobSet>, ConfigError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| ConfigError::InvalidGlob {
            pattern: patterns.join(", "),
            message: e.to_string(),
        })
}

fn glob_match(set: &Option<GlobSet>, path: &str) -> bool {
    set.as_ref().is_some_and(|s| s.is_match(path))
}

impl ResolvedConfig {
    /// Fails on the first unknown rule id or invalid glob; nothing is
    /// scanned in that case.
    pub fn resolve(config: &AegisConfig, registry: &RuleRegistry) -> Result<Self, ConfigError> {
        if let Some(unknown) = config.rules.keys().find(|id| !registry.contains(id)) {
            return Err(ConfigError::UnknownRule {
                rule_id: unknown.clone(),
            });
        }

        let mut rules = Vec::with_capacity(registry.len());
        for rule in registry.iter() {
            let setting = config.rules.get(rule.meta().id);
            rules.push(ResolvedRule {
                enabled: setting.map_or(true, |s| s.effective_enabled()),
                severity_override: setting.and_then(|s| s.severity),
                exclude: match setting {
                    Some(s) => compile_globs(&s.exclude_paths)?,
                    None => None,
                },
            });
        }

        let resolved = Self {
            rules,
            exclude: compile_globs(&config.exclude_paths)?,
            fail_on: config.effective_fail_on(),
            threads: config.scan.effective_threads(),
            max_file_size: config.scan.effective_max_file_size(),
            file_timeout_ms: config.scan.effective_file_timeout_ms(),
        };
        tracing::debug!(
            enabled = resolved.rules.iter().filter(|r| r.enabled).count(),
            total = resolved.rules.len(),
            "configuration resolved"
        );
        Ok(resolved)
    }

    /// Defaults for every registered rule.
    pub fn defaults(registry: &RuleRegistry) -> Self {
        // Default config names no rules and no globs, so it cannot fail.
        Self::resolve(&AegisConfig::default(), registry).unwrap_or_else(|_| Self {
            rules: Vec::new(),
            exclude: None,
            fail_on: FailOn::default(),
            threads: 0,
            max_file_size: aegis_core::constants::DEFAULT_MAX_FILE_SIZE,
            file_timeout_ms: aegis_core::constants::DEFAULT_FILE_TIMEOUT_MS,
        })
    }

    /// Whether `path` is excluded from the whole scan.
    pub fn is_excluded(&self, path: &str) -> bool {
        glob_match(&self.exclude, path)
    }

    pub fn rule(&self, index: usize) -> Option<&ResolvedRule> {
        self.rules.get(index)
    }

    /// Whether the rule at `index` runs on `path`.
    pub fn rule_applies(&self, index: usize, path: &str) -> bool {
        self.rules
            .get(index)
            .is_some_and(|r| r.enabled && !glob_match(&r.exclude, path))
    }

    /// Per-registry-index mask of the rules that run on `path`.
    pub fn active_mask(&self, path: &str) -> Vec<bool> {
        (0..self.rules.len())
            .map(|i| self.rule_applies(i, path))
            .collect()
    }

    /// Whether the rule at `index` is enabled at all.
    pub fn is_enabled(&self, index: usize) -> bool {
        self.rules.get(index).is_some_and(|r| r.enabled)
    }

    /// Config override, then the finding's own severity, then the rule
    /// default.
    pub fn severity(&self, index: usize, finding: Option<Severity>, default: Severity) -> Severity {
        self.rules
            .get(index)
            .and_then(|r| r.severity_override)
            .or(finding)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::config::RuleSetting;

    #[test]
    fn test_unknown_rule_rejected() {
        let registry = RuleRegistry::builtin();
        let mut config = AegisConfig::default();
        config
            .rules
            .insert("does-not-exist".to_string(), RuleSetting::default());
        let err = ResolvedConfig::resolve(&config, &registry).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRule { ref rule_id } if rule_id == "does-not-exist"));
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let registry = RuleRegistry::builtin();
        let config = AegisConfig {
            exclude_paths: vec!["src/[".to_string()],
            ..AegisConfig::default()
        };
        let err = ResolvedConfig::resolve(&config, &registry).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGlob { .. }));
    }

    #[test]
    fn test_overrides_and_exclusions() {
        let registry = RuleRegistry::builtin();
        let mut config = AegisConfig::default();
        config.rules.insert(
            "no-weak-crypto".to_string(),
            RuleSetting {
                enabled: Some(false),
                ..RuleSetting::default()
            },
        );
        config.rules.insert(
            "no-insecure-transport".to_string(),
            RuleSetting {
                severity: Some(Severity::Error),
                exclude_paths: vec!["test/**".to_string()],
                ..RuleSetting::default()
            },
        );
        config.exclude_paths = vec!["vendor/**".to_string()];
        let resolved = ResolvedConfig::resolve(&config, &registry).unwrap();

        let crypto = registry.index_of("no-weak-crypto").unwrap();
        let transport = registry.index_of("no-insecure-transport").unwrap();
        assert!(!resolved.rule_applies(crypto, "src/a.js"));
        assert!(resolved.rule_applies(transport, "src/a.js"));
        assert!(!resolved.rule_applies(transport, "test/a.js"));
        assert!(resolved.is_excluded("vendor/lib/x.js"));
        assert_eq!(
            resolved.severity(transport, Some(Severity::Info), Severity::Warning),
            Severity::Error
        );
        let secrets = registry.index_of("no-hardcoded-secrets").unwrap();
        assert_eq!(
            resolved.severity(secrets, Some(Severity::Warning), Severity::Error),
            Severity::Warning
        );
    }
}
