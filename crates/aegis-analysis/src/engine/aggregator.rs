//! Diagnostic aggregator: dedup, whole-program reduce, deterministic order.

use std::panic::{catch_unwind, AssertUnwindSafe};

use aegis_core::types::collections::{FxHashMap, FxHashSet};
use aegis_core::types::Severity;

use super::dispatcher::{finding_to_diagnostic, panic_message, FileOutcome, FileStatus};
use super::resolver::ResolvedConfig;
use super::types::{Diagnostic, ScanResult};
use crate::patterns::PatternContext;
use crate::rules::{Fact, FindingSink, ReduceContext, RuleRegistry};

/// Identity of a diagnostic for deduplication. The message is part of the
/// key so that two findings of one rule at one span with different data
/// (two URLs passed to the same call) both survive.
type DedupKey = (String, String, String, (u32, u32, u32, u32), String);

fn dedup_key(d: &Diagnostic) -> DedupKey {
    (
        d.rule_id.clone(),
        d.message_id.clone(),
        d.unit.clone(),
        (d.span.start_line, d.span.start_column, d.span.end_line, d.span.end_column),
        d.message.clone(),
    )
}

/// Per-run accumulator. Owns the facts of whole-program rules so that rules
/// themselves stay stateless.
#[derive(Debug, Default)]
pub struct DiagnosticAggregator {
    seen: FxHashSet<DedupKey>,
    diagnostics: Vec<Diagnostic>,
    facts: FxHashMap<usize, Vec<Fact>>,
    /// Per whole-program rule, units it did not fully see.
    partial: FxHashMap<usize, usize>,
    files_scanned: usize,
    files_skipped: usize,
}

impl DiagnosticAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one diagnostic unless an identical one is already present.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        if self.seen.insert(dedup_key(&diagnostic)) {
            self.diagnostics.push(diagnostic);
            true
        } else {
            false
        }
    }

    /// Merge the outcome of one unit.
    pub fn add_outcome(&mut self, outcome: FileOutcome) {
        match outcome.status {
            FileStatus::Completed => self.files_scanned += 1,
            FileStatus::TimedOut => self.files_skipped += 1,
            FileStatus::Cancelled => return,
        }
        for d in outcome.diagnostics {
            self.push(d);
        }
        for (index, fact) in outcome.facts {
            self.facts.entry(index).or_default().push(fact);
        }
        for index in outcome.partial_rules {
            *self.partial.entry(index).or_default() += 1;
        }
    }

    /// A file that never reached the dispatcher (read or parse failure).
    pub fn add_skipped(&mut self, diagnostic: Diagnostic) {
        self.files_skipped += 1;
        self.push(diagnostic);
    }

    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }

    pub fn facts_for(&self, index: usize) -> &[Fact] {
        self.facts.get(&index).map_or(&[][..], |f| f.as_slice())
    }

    /// Run every enabled whole-program rule over its facts. Findings get the
    /// file-less unit `""` and whatever span the rule gave them.
    pub fn reduce(
        &mut self,
        registry: &RuleRegistry,
        config: &ResolvedConfig,
        patterns: &PatternContext,
    ) {
        let mut sink = FindingSink::new();
        for (index, rule) in registry.iter().enumerate() {
            if !rule.meta().whole_program || !config.is_enabled(index) {
                continue;
            }
            let facts = self.facts.remove(&index).unwrap_or_default();
            let ctx = ReduceContext {
                facts: &facts,
                units_scanned: self.files_scanned,
                units_partial: self.partial.get(&index).copied().unwrap_or(0),
                patterns,
            };
            let outcome = catch_unwind(AssertUnwindSafe(|| rule.reduce(&ctx, &mut sink)));
            match outcome {
                Ok(()) => {
                    let (findings, _) = sink.drain();
                    for finding in findings {
                        let diagnostic = finding_to_diagnostic(rule, index, finding, "", config);
                        self.push(diagnostic);
                    }
                }
                Err(payload) => {
                    sink.clear();
                    let message = panic_message(&*payload);
                    tracing::warn!(rule = rule.meta().id, message = %message, "whole-program pass panicked");
                    self.push(Diagnostic::internal(
                        rule.meta().id,
                        "internalError",
                        "",
                        Severity::Warning,
                        format!("Rule {} panicked: {message}", rule.meta().id),
                    ));
                }
            }
        }
    }

    /// Sort and package the final result.
    pub fn finish(self, cancelled: bool, duration_ms: u64) -> ScanResult {
        let mut diagnostics = self.diagnostics;
        sort_diagnostics(&mut diagnostics);
        let mut result = ScanResult::from_diagnostics(diagnostics);
        result.files_scanned = self.files_scanned;
        result.files_skipped = self.files_skipped;
        result.cancelled = cancelled;
        result.duration_ms = duration_ms;
        result
    }
}

/// Order by unit path, line, column, rule id.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Span;

    fn diag(unit: &str, line: u32, rule: &str, message: &str) -> Diagnostic {
        let mut d = Diagnostic::internal(rule, "m", unit, Severity::Warning, message);
        d.span = Span::new(line, 1, line, 10);
        d
    }

    #[test]
    fn test_dedup_keeps_distinct_messages() {
        let mut agg = DiagnosticAggregator::new();
        assert!(agg.push(diag("a.js", 1, "r", "x")));
        assert!(!agg.push(diag("a.js", 1, "r", "x")));
        assert!(agg.push(diag("a.js", 1, "r", "y")));
        assert_eq!(agg.finish(false, 0).diagnostics.len(), 2);
    }

    #[test]
    fn test_sort_order() {
        let mut agg = DiagnosticAggregator::new();
        agg.push(diag("b.js", 1, "a-rule", ""));
        agg.push(diag("a.js", 9, "a-rule", ""));
        agg.push(diag("a.js", 2, "z-rule", ""));
        agg.push(diag("a.js", 2, "b-rule", ""));
        agg.push(diag("", 0, "whole", ""));
        let result = agg.finish(false, 0);
        let order: Vec<(&str, u32, &str)> = result
            .diagnostics
            .iter()
            .map(|d| (d.unit.as_str(), d.span.start_line, d.rule_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("", 0, "whole"),
                ("a.js", 2, "b-rule"),
                ("a.js", 2, "z-rule"),
                ("a.js", 9, "a-rule"),
                ("b.js", 1, "a-rule"),
            ]
        );
    }
}
