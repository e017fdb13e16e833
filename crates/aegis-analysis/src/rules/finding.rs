//! Findings and facts reported by rule visitors.

use aegis_core::types::collections::SmallVec2;
use aegis_core::types::Severity;

use crate::tree::{NodeId, SourceTree, Span};

/// One raw finding, before the engine attaches rule metadata and config.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub message_id: &'static str,
    pub span: Span,
    /// Template data, in insertion order.
    pub data: SmallVec2<(&'static str, String)>,
    pub fix: Option<String>,
    /// Finding-specific severity; `None` uses the rule default.
    pub severity: Option<Severity>,
}

impl Finding {
    pub fn new(message_id: &'static str, span: Span) -> Self {
        Self {
            message_id,
            span,
            data: SmallVec2::new(),
            fix: None,
            severity: None,
        }
    }

    /// Finding located at `node`.
    pub fn at(tree: &SourceTree, node: NodeId, message_id: &'static str) -> Self {
        Self::new(message_id, tree.span(node))
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.data.push((key, value.into()));
        self
    }

    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// A per-file observation recorded by a whole-program rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub key: &'static str,
    pub value: String,
    /// Unit the fact was observed in; filled in by the dispatcher.
    pub unit: String,
}

/// Collects findings and facts from one visitor call.
#[derive(Debug, Default)]
pub struct FindingSink {
    findings: Vec<Finding>,
    facts: Vec<Fact>,
}

impl FindingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn record(&mut self, key: &'static str, value: impl Into<String>) {
        self.facts.push(Fact {
            key,
            value: value.into(),
            unit: String::new(),
        });
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty() && self.facts.is_empty()
    }

    /// Take everything reported so far.
    pub fn drain(&mut self) -> (Vec<Finding>, Vec<Fact>) {
        (
            std::mem::take(&mut self.findings),
            std::mem::take(&mut self.facts),
        )
    }

    /// Drop anything reported since the last drain.
    pub fn clear(&mut self) {
        self.findings.clear();
        self.facts.clear();
    }
}
