//! `no-hardcoded-secrets`: high-entropy literals and credentials bound to
//! literal values.

use aegis_core::types::Severity;

use super::context::VisitContext;
use super::finding::{Finding, FindingSink};
use super::traits::{Rule, RuleCategory, RuleMeta};
use crate::patterns::looks_encoded;
use crate::tree::{NodeId, NodeKind};

pub static META: RuleMeta = RuleMeta {
    id: "no-hardcoded-secrets",
    category: RuleCategory::Secrets,
    default_severity: Severity::Error,
    description: "Secrets and credentials must not be hardcoded in source.",
    messages: &[
        (
            "highEntropyString",
            "High-entropy {encoding} string ({length} chars) looks like a hardcoded secret.",
        ),
        (
            "hardcodedCredential",
            "'{name}' is assigned a hardcoded value; load it from the environment or a secret manager.",
        ),
    ],
    whole_program: false,
};

pub struct NoHardcodedSecrets;

impl NoHardcodedSecrets {
    /// Literal that holds a credential value.
    fn is_credential_literal(ctx: &VisitContext<'_>, value: NodeId) -> bool {
        ctx.tree
            .string_value(value)
            .is_some_and(|v| !v.trim().is_empty())
    }

    /// The literal is the value of a binding that already reports
    /// `hardcodedCredential`.
    fn bound_to_secret_name(ctx: &VisitContext<'_>) -> bool {
        let Some(parent) = ctx.parent() else {
            return false;
        };
        matches!(
            ctx.tree.kind(parent),
            NodeKind::VariableDeclarator | NodeKind::Assignment | NodeKind::Property
        ) && ctx.tree.binding_value(parent).or_else(|| ctx.tree.property_value(parent))
            == Some(ctx.node)
            && ctx
                .tree
                .binding_name(parent)
                .is_some_and(|n| ctx.patterns.is_secret_name(n))
    }

    fn check_literal(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let Some(value) = ctx.text() else {
            return;
        };
        let Some(encoding) = looks_encoded(value) else {
            return;
        };
        if Self::bound_to_secret_name(ctx) {
            return;
        }
        sink.report(
            Finding::at(ctx.tree, ctx.node, "highEntropyString")
                .with("encoding", encoding.name())
                .with("length", value.chars().count().to_string())
                .fix("Move the value to an environment variable or secret store."),
        );
    }

    fn check_binding(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let Some(name) = tree.binding_name(ctx.node) else {
            return;
        };
        if !ctx.patterns.is_secret_name(name) {
            return;
        }
        let value = match ctx.kind() {
            NodeKind::Property => tree.property_value(ctx.node),
            _ => tree.binding_value(ctx.node),
        };
        let Some(value) = value else {
            return;
        };
        if Self::is_credential_literal(ctx, value) {
            sink.report(
                Finding::at(tree, ctx.node, "hardcodedCredential")
                    .with("name", name)
                    .fix(format!("Read {name} from configuration at runtime.")),
            );
        }
    }
}

impl Rule for NoHardcodedSecrets {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[
            NodeKind::StringLiteral,
            NodeKind::VariableDeclarator,
            NodeKind::Assignment,
            NodeKind::Property,
        ]
    }

    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        match ctx.kind() {
            NodeKind::StringLiteral => self.check_literal(ctx, sink),
            _ => self.check_binding(ctx, sink),
        }
    }
}
