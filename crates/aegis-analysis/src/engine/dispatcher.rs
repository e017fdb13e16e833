//! Single-pass dispatcher: one iterative traversal per unit, routing each
//! node to the rules registered for its kind.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use aegis_core::constants::{DEADLINE_CHECK_INTERVAL, TIMEOUT_RULE_ID};
use aegis_core::errors::{AegisErrorCode, RuleError};
use aegis_core::traits::Cancellable;
use aegis_core::types::Severity;

use super::file_index::FileIndex;
use super::resolver::ResolvedConfig;
use super::suppression::SuppressionChecker;
use super::types::{render_template, Diagnostic};
use crate::patterns::PatternContext;
use crate::rules::{Fact, Finding, FindingSink, Rule, RuleRegistry, VisitContext};
use crate::tree::{NodeId, SourceUnit};

/// How the traversal of one unit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Completed,
    /// Deadline exceeded; findings dropped, facts gathered so far and one
    /// timeout diagnostic kept.
    TimedOut,
    /// Cancelled mid-file; nothing from this unit is kept.
    Cancelled,
}

/// Everything one unit contributes to the scan.
#[derive(Debug)]
pub struct FileOutcome {
    pub unit: String,
    pub status: FileStatus,
    pub diagnostics: Vec<Diagnostic>,
    /// Facts keyed by registry index of the recording rule.
    pub facts: Vec<(usize, Fact)>,
    /// Enabled whole-program rules that did not see all of this unit: the
    /// unit was outside the rule's paths, the rule panicked on it, or the
    /// traversal timed out.
    pub partial_rules: Vec<usize>,
}

impl FileOutcome {
    fn empty(unit: &str, status: FileStatus) -> Self {
        Self {
            unit: unit.to_string(),
            status,
            diagnostics: Vec::new(),
            facts: Vec::new(),
            partial_rules: Vec::new(),
        }
    }
}

enum Frame {
    Enter(NodeId),
    Exit,
}

/// Turn a raw finding into a diagnostic with metadata, severity precedence
/// and the rendered message applied.
pub(crate) fn finding_to_diagnostic(
    rule: &dyn Rule,
    index: usize,
    finding: Finding,
    unit: &str,
    config: &ResolvedConfig,
) -> Diagnostic {
    let meta = rule.meta();
    let template = meta.template(finding.message_id).unwrap_or(finding.message_id);
    let message = render_template(
        template,
        finding.data.iter().map(|(k, v)| (*k, v.as_str())),
    );
    let data: BTreeMap<String, String> = finding
        .data
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    Diagnostic {
        rule_id: meta.id.to_string(),
        message_id: finding.message_id.to_string(),
        category: meta.category.name().to_string(),
        severity: config.severity(index, finding.severity, meta.default_severity),
        message,
        unit: unit.to_string(),
        span: finding.span,
        data,
        fix: finding.fix,
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Routes nodes of one unit to the matching rule visitors.
pub struct Dispatcher<'r> {
    registry: &'r RuleRegistry,
    config: &'r ResolvedConfig,
    patterns: &'r PatternContext,
}

impl<'r> Dispatcher<'r> {
    pub fn new(
        registry: &'r RuleRegistry,
        config: &'r ResolvedConfig,
        patterns: &'r PatternContext,
    ) -> Self {
        Self {
            registry,
            config,
            patterns,
        }
    }

    /// Traverse `unit` once with the configured per-file deadline.
    pub fn run(&self, unit: &SourceUnit, cancel: &dyn Cancellable) -> FileOutcome {
        let timeout = Duration::from_millis(self.config.file_timeout_ms);
        self.run_until(unit, cancel, Instant::now() + timeout)
    }

    /// Traverse `unit` once, giving up at `deadline`.
    pub fn run_until(
        &self,
        unit: &SourceUnit,
        cancel: &dyn Cancellable,
        deadline: Instant,
    ) -> FileOutcome {
        let path = unit.path.as_str();
        if cancel.is_cancelled() {
            return FileOutcome::empty(path, FileStatus::Cancelled);
        }
        let active = self.config.active_mask(path);
        if !active.iter().any(|a| *a) {
            let mut outcome = FileOutcome::empty(path, FileStatus::Completed);
            outcome.partial_rules = self.partial_rules(&active, &[], false);
            return outcome;
        }

        let tree = &unit.tree;
        let file = FileIndex::build(tree);
        let mut disabled = vec![false; self.registry.len()];
        let mut findings: Vec<(usize, Finding)> = Vec::new();
        let mut facts: Vec<(usize, Fact)> = Vec::new();
        let mut internal: Vec<Diagnostic> = Vec::new();

        let mut sink = FindingSink::new();
        let mut ancestors: Vec<NodeId> = Vec::with_capacity(64);
        let mut stack = vec![Frame::Enter(tree.root())];
        let mut visits = 0usize;

        while let Some(frame) = stack.pop() {
            let id = match frame {
                Frame::Exit => {
                    ancestors.pop();
                    continue;
                }
                Frame::Enter(id) => id,
            };

            visits += 1;
            if visits % DEADLINE_CHECK_INTERVAL == 0 {
                if cancel.is_cancelled() {
                    tracing::debug!(unit = path, visits, "cancelled mid-file");
                    return FileOutcome::empty(path, FileStatus::Cancelled);
                }
                if Instant::now() >= deadline {
                    let partial_rules = self.partial_rules(&active, &disabled, true);
                    return self.timed_out(path, facts, partial_rules);
                }
            }

            for &index in self.registry.for_kind(tree.kind(id)) {
                if !active[index] || disabled[index] {
                    continue;
                }
                let Some(rule) = self.registry.get(index) else {
                    continue;
                };
                let ctx = VisitContext {
                    unit,
                    tree,
                    node: id,
                    ancestors: &ancestors,
                    patterns: self.patterns,
                    file: &file,
                };
                let outcome = catch_unwind(AssertUnwindSafe(|| rule.visit(&ctx, &mut sink)));
                match outcome {
                    Ok(()) => {
                        let (new_findings, new_facts) = sink.drain();
                        findings.extend(new_findings.into_iter().map(|f| (index, f)));
                        facts.extend(new_facts.into_iter().map(|mut f| {
                            f.unit = path.to_string();
                            (index, f)
                        }));
                    }
                    Err(payload) => {
                        sink.clear();
                        disabled[index] = true;
                        internal.push(self.rule_panicked(rule, path, &*payload));
                    }
                }
            }

            let children = tree.children(id);
            if !children.is_empty() {
                ancestors.push(id);
                stack.push(Frame::Exit);
                stack.extend(children.iter().rev().map(|c| Frame::Enter(*c)));
            }
        }

        let suppressions = SuppressionChecker::from_tree(tree);
        let mut diagnostics = internal;
        for (index, finding) in findings {
            let Some(rule) = self.registry.get(index) else {
                continue;
            };
            if suppressions.is_suppressed(finding.span.start_line, rule.meta().id) {
                continue;
            }
            diagnostics.push(finding_to_diagnostic(rule, index, finding, path, self.config));
        }

        tracing::debug!(unit = path, visits, diagnostics = diagnostics.len(), "unit analyzed");
        FileOutcome {
            unit: path.to_string(),
            status: FileStatus::Completed,
            diagnostics,
            facts,
            partial_rules: self.partial_rules(&active, &disabled, false),
        }
    }

    /// Enabled whole-program rules whose view of the unit is incomplete.
    fn partial_rules(&self, active: &[bool], disabled: &[bool], timed_out: bool) -> Vec<usize> {
        self.registry
            .iter()
            .enumerate()
            .filter(|(index, rule)| rule.meta().whole_program && self.config.is_enabled(*index))
            .filter(|(index, _)| {
                timed_out
                    || !active.get(*index).copied().unwrap_or(false)
                    || disabled.get(*index).copied().unwrap_or(false)
            })
            .map(|(index, _)| index)
            .collect()
    }

    fn rule_panicked(&self, rule: &dyn Rule, unit: &str, payload: &(dyn Any + Send)) -> Diagnostic {
        let error = RuleError::Panicked {
            rule_id: rule.meta().id.to_string(),
            message: panic_message(payload),
        };
        tracing::warn!(unit, rule = rule.meta().id, error = %error, "rule disabled for this file");
        Diagnostic::internal(
            rule.meta().id,
            "internalError",
            unit,
            Severity::Warning,
            error.coded_string(),
        )
    }

    fn timed_out(
        &self,
        unit: &str,
        facts: Vec<(usize, Fact)>,
        partial_rules: Vec<usize>,
    ) -> FileOutcome {
        let error = RuleError::Timeout {
            timeout_ms: self.config.file_timeout_ms,
        };
        tracing::warn!(unit, error = %error, facts = facts.len(), "file skipped");
        let mut outcome = FileOutcome::empty(unit, FileStatus::TimedOut);
        outcome.facts = facts;
        outcome.partial_rules = partial_rules;
        outcome.diagnostics.push(Diagnostic::internal(
            TIMEOUT_RULE_ID,
            "timeout",
            unit,
            Severity::Warning,
            error.coded_string(),
        ));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::rules::rate_limit;
    use crate::tree::{Language, TreeBuilder};

    /// Over `DEADLINE_CHECK_INTERVAL` nodes, with a plain-http fetch and a
    /// rate limiter import up front.
    fn large_unit() -> SourceUnit {
        let mut b = TreeBuilder::new();
        let src = b.string("express-rate-limit");
        let mut top = vec![b.call_path("require", vec![src])];
        let url = b.string("http://example.com");
        top.push(b.call_path("fetch", vec![url]));
        for i in 0..200 {
            let value = b.number(&i.to_string());
            top.push(b.declare(&format!("v{i}"), value));
        }
        b.unit("big.js", Language::JavaScript, top)
    }

    /// Reports "not cancelled" for the first `allowed` polls.
    struct CancelAfter {
        allowed: usize,
        polls: AtomicUsize,
    }

    impl Cancellable for CancelAfter {
        fn is_cancelled(&self) -> bool {
            self.polls.fetch_add(1, Ordering::SeqCst) >= self.allowed
        }

        fn cancel(&self) {}
    }

    fn fixture() -> (RuleRegistry, ResolvedConfig, PatternContext) {
        let registry = RuleRegistry::builtin();
        let config = ResolvedConfig::defaults(&registry);
        (registry, config, PatternContext::new())
    }

    fn never() -> CancelAfter {
        CancelAfter {
            allowed: usize::MAX,
            polls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_completed_unit_keeps_findings() {
        let (registry, config, patterns) = fixture();
        let unit = large_unit();
        assert!(unit.tree.len() > DEADLINE_CHECK_INTERVAL);

        let outcome = Dispatcher::new(&registry, &config, &patterns).run(&unit, &never());
        assert_eq!(outcome.status, FileStatus::Completed);
        assert!(outcome.diagnostics.iter().any(|d| d.message_id == "httpDetected"));
        assert!(outcome.partial_rules.is_empty());
    }

    #[test]
    fn test_past_deadline_drops_findings_keeps_facts() {
        let (registry, config, patterns) = fixture();
        let unit = large_unit();
        let dispatcher = Dispatcher::new(&registry, &config, &patterns);

        let outcome = dispatcher.run_until(&unit, &never(), Instant::now());
        assert_eq!(outcome.status, FileStatus::TimedOut);
        assert_eq!(outcome.diagnostics.len(), 1);
        let timeout = &outcome.diagnostics[0];
        assert_eq!(timeout.rule_id, TIMEOUT_RULE_ID);
        assert_eq!(timeout.message_id, "timeout");
        assert_eq!(timeout.severity, Severity::Warning);
        assert!(timeout.message.starts_with("[TIMEOUT]"));

        let limiter = registry.index_of(rate_limit::META.id).unwrap();
        assert!(outcome.facts.iter().any(|(i, f)| *i == limiter && f.key == "configured"));
        assert_eq!(outcome.partial_rules, vec![limiter]);
    }

    #[test]
    fn test_cancelled_mid_file_keeps_nothing() {
        let (registry, config, patterns) = fixture();
        let unit = large_unit();
        let cancel = CancelAfter {
            allowed: 1,
            polls: AtomicUsize::new(0),
        };

        let outcome = Dispatcher::new(&registry, &config, &patterns).run(&unit, &cancel);
        assert_eq!(outcome.status, FileStatus::Cancelled);
        assert!(outcome.diagnostics.is_empty());
        assert!(outcome.facts.is_empty());
        assert_eq!(cancel.polls.load(Ordering::SeqCst), 2);
    }
}
