//! Engine output types: diagnostics and the scan result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use aegis_core::constants::INTERNAL_CATEGORY;
use aegis_core::types::{FailOn, Severity};

use crate::tree::Span;

/// One reported finding, with rule metadata and configuration applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub rule_id: String,
    pub message_id: String,
    pub category: String,
    pub severity: Severity,
    pub message: String,
    /// Unit path; empty for whole-program findings.
    pub unit: String,
    pub span: Span,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl Diagnostic {
    /// Diagnostic produced by the engine itself (parse failure, timeout,
    /// rule panic) rather than by a rule's visitor.
    pub fn internal(
        rule_id: &str,
        message_id: &str,
        unit: &str,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            message_id: message_id.to_string(),
            category: INTERNAL_CATEGORY.to_string(),
            severity,
            message: message.into(),
            unit: unit.to_string(),
            span: Span::synthetic(),
            data: BTreeMap::new(),
            fix: None,
        }
    }

    pub fn is_whole_program(&self) -> bool {
        self.unit.is_empty()
    }

    /// Total order used for output: unit, line, column, rule id, then the
    /// remaining fields so that equal positions still sort stably.
    pub fn sort_key(&self) -> (&str, u32, u32, &str, &str, u32, u32, &str) {
        (
            &self.unit,
            self.span.start_line,
            self.span.start_column,
            &self.rule_id,
            &self.message_id,
            self.span.end_line,
            self.span.end_column,
            &self.message,
        )
    }
}

/// Interpolate `{key}` placeholders from `data`. Unknown keys stay verbatim.
pub fn render_template<'a>(
    template: &str,
    data: impl IntoIterator<Item = (&'a str, &'a str)> + Clone,
) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match data.clone().into_iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Diagnostic counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }
}

/// Final, ordered result of a scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub diagnostics: Vec<Diagnostic>,
    pub counts: SeverityCounts,
    pub by_category: BTreeMap<String, usize>,
    pub has_errors: bool,
    pub files_scanned: usize,
    pub files_skipped: usize,
    /// The scan stopped early; the diagnostics cover the files finished so far.
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl ScanResult {
    /// Build a result from already sorted, deduplicated diagnostics.
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let mut counts = SeverityCounts::default();
        let mut by_category = BTreeMap::new();
        for d in &diagnostics {
            counts.add(d.severity);
            *by_category.entry(d.category.clone()).or_insert(0) += 1;
        }
        Self {
            has_errors: counts.error > 0,
            diagnostics,
            counts,
            by_category,
            ..Self::default()
        }
    }

    /// Process exit status: 1 when any diagnostic meets the threshold.
    pub fn exit_code(&self, fail_on: FailOn) -> i32 {
        let failing = self
            .diagnostics
            .iter()
            .any(|d| fail_on.is_triggered_by(d.severity));
        i32::from(failing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        let data = [("algo", "md5"), ("recommended", "sha256")];
        assert_eq!(
            render_template("Use {recommended} instead of {algo}.", data),
            "Use sha256 instead of md5."
        );
        assert_eq!(render_template("Missing {key}", data), "Missing {key}");
        assert_eq!(render_template("Unclosed {brace", data), "Unclosed {brace");
    }

    #[test]
    fn test_exit_code_threshold() {
        let warn = Diagnostic::internal("r", "m", "a.js", Severity::Warning, "w");
        let result = ScanResult::from_diagnostics(vec![warn]);
        assert_eq!(result.exit_code(FailOn::Error), 0);
        assert_eq!(result.exit_code(FailOn::Warning), 1);
        assert!(!result.has_errors);
        assert_eq!(result.by_category.get(INTERNAL_CATEGORY), Some(&1));
    }
}
