//! `no-unsafe-deserialization`: dangerous deserialization/eval sinks and
//! unchecked generic parsing.

use aegis_core::types::Severity;

use super::common::{call_option, calls_matching, path_is, scope_has_type_check};
use super::context::VisitContext;
use super::finding::{Finding, FindingSink};
use super::traits::{Rule, RuleCategory, RuleMeta};
use crate::tree::NodeKind;

pub static META: RuleMeta = RuleMeta {
    id: "no-unsafe-deserialization",
    category: RuleCategory::Deserialization,
    default_severity: Severity::Error,
    description: "Untrusted data must not reach code-executing deserializers.",
    messages: &[
        (
            "unsafeDeserialization",
            "'{call}' can execute code embedded in its input; use a safe format or loader.",
        ),
        (
            "missingTypeCheck",
            "Result of '{call}' is used without a type or schema check in this scope.",
        ),
    ],
    whole_program: false,
};

const DANGEROUS_SINKS: &[&str] = &[
    "eval",
    "exec",
    "Function",
    "pickle.loads",
    "pickle.load",
    "cPickle.loads",
    "cPickle.load",
    "_pickle.loads",
    "dill.loads",
    "dill.load",
    "marshal.loads",
    "marshal.load",
    "shelve.open",
    "jsonpickle.decode",
    "yaml.load",
    "yaml.load_all",
    "yaml.unsafe_load",
    "yaml.full_load",
    "unserialize",
    "serialize.unserialize",
    "vm.runInNewContext",
    "vm.runInThisContext",
];

const GENERIC_PARSERS: &[&str] = &[
    "JSON.parse",
    "JSON5.parse",
    "json.loads",
    "json.load",
    "ujson.loads",
    "orjson.loads",
    "simplejson.loads",
    "yaml.safe_load",
];

const SAFE_YAML_LOADERS: &[&str] = &["SafeLoader", "CSafeLoader", "BaseLoader"];

pub struct NoUnsafeDeserialization;

/// Bare builtins (`eval`, `exec`) must match exactly so that
/// `child_process.exec` or `regex.exec` are not mistaken for them.
fn is_sink(path: &str, sink: &str) -> bool {
    if sink.contains('.') {
        path_is(path, sink)
    } else {
        path == sink
    }
}

impl NoUnsafeDeserialization {
    /// `yaml.load(data, Loader=yaml.SafeLoader)` is safe.
    fn has_safe_loader(ctx: &VisitContext<'_>) -> bool {
        let tree = ctx.tree;
        let loader = call_option(tree, ctx.node, "Loader")
            .and_then(|p| tree.property_value(p))
            .or_else(|| tree.call_args(ctx.node).nth(1));
        loader
            .and_then(|l| tree.dotted_path(l))
            .is_some_and(|p| SAFE_YAML_LOADERS.iter().any(|s| path_is(&p, s)))
    }

    /// First argument exists and is not a constant literal.
    fn has_dynamic_input(ctx: &VisitContext<'_>) -> bool {
        ctx.tree
            .call_args(ctx.node)
            .next()
            .is_some_and(|a| !ctx.tree.kind(a).is_constant())
    }
}

impl Rule for NoUnsafeDeserialization {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::Call, NodeKind::New]
    }

    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let Some(path) = tree.callee_path(ctx.node) else {
            return;
        };
        if !Self::has_dynamic_input(ctx) {
            return;
        }

        if let Some(sink_name) = DANGEROUS_SINKS.iter().find(|s| is_sink(&path, s)) {
            if sink_name.starts_with("yaml.load") && Self::has_safe_loader(ctx) {
                return;
            }
            sink.report(
                Finding::at(tree, ctx.node, "unsafeDeserialization")
                    .with("call", path.as_str())
                    .fix("Parse with a data-only format (JSON) or a safe loader."),
            );
            return;
        }

        if ctx.kind() == NodeKind::Call && GENERIC_PARSERS.iter().any(|p| path_is(&path, p)) {
            let scope = ctx.scope();
            if scope_has_type_check(tree, scope)
                || calls_matching(tree, scope, &ctx.patterns.validation_calls)
            {
                return;
            }
            sink.report(
                Finding::at(tree, ctx.node, "missingTypeCheck")
                    .with("call", path.as_str())
                    .fix("Validate the parsed value against a schema or check its type."),
            );
        }
    }
}
