//! Rule trait, rule metadata, and category enum.

use aegis_core::types::Severity;

use super::context::{ReduceContext, VisitContext};
use super::finding::FindingSink;
use crate::tree::NodeKind;

/// Static description of a rule.
#[derive(Debug)]
pub struct RuleMeta {
    /// Globally unique, stable id (`no-weak-crypto`).
    pub id: &'static str,
    pub category: RuleCategory,
    pub default_severity: Severity,
    pub description: &'static str,
    /// `(messageId, template)` pairs. Templates interpolate `{key}` from the
    /// finding's data.
    pub messages: &'static [(&'static str, &'static str)],
    /// Whether the rule also runs a reduce pass after every file is visited.
    pub whole_program: bool,
}

impl RuleMeta {
    pub fn template(&self, message_id: &str) -> Option<&'static str> {
        self.messages
            .iter()
            .find(|(id, _)| *id == message_id)
            .map(|(_, t)| *t)
    }

    pub fn message_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.messages.iter().map(|(id, _)| *id)
    }
}

/// Trait that every rule must implement.
///
/// Rules are immutable and shared by all workers. Per-file observations
/// needed by whole-program checks are recorded as facts on the sink, never
/// kept on the rule.
pub trait Rule: Send + Sync {
    fn meta(&self) -> &'static RuleMeta;

    /// Node kinds this rule's visitor is invoked for.
    fn node_kinds(&self) -> &'static [NodeKind];

    /// Inspect `ctx.node` and report zero or more findings.
    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink);

    /// Whole-program pass over the facts recorded by `visit` on every file.
    fn reduce(&self, _ctx: &ReduceContext<'_>, _sink: &mut FindingSink) {}
}

/// The 10 rule categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleCategory {
    Secrets,
    Transport,
    Crypto,
    Deserialization,
    Authn,
    TokenHandling,
    RateLimiting,
    Headers,
    InputValidation,
    DataLeak,
}

impl RuleCategory {
    pub fn all() -> &'static [RuleCategory] {
        &[
            Self::Secrets, Self::Transport, Self::Crypto, Self::Deserialization,
            Self::Authn, Self::TokenHandling, Self::RateLimiting, Self::Headers,
            Self::InputValidation, Self::DataLeak,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Secrets => "secrets",
            Self::Transport => "transport",
            Self::Crypto => "crypto",
            Self::Deserialization => "deserialization",
            Self::Authn => "authn",
            Self::TokenHandling => "token-handling",
            Self::RateLimiting => "rate-limiting",
            Self::Headers => "headers",
            Self::InputValidation => "input-validation",
            Self::DataLeak => "data-leak",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
