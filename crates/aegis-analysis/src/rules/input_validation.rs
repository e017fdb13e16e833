//! `require-input-validation`: request handlers must validate their input,
//! and request data must not reach query, shell, path or NoSQL sinks
//! unvalidated.

use aegis_core::types::Severity;

use super::common::{
    calls_matching, is_interpolated, is_tainted, last_segment, mentions, path_is,
    request_bound_names, resolve_local, scope_has_type_check, static_text,
};
use super::context::VisitContext;
use super::finding::{Finding, FindingSink};
use super::traits::{Rule, RuleCategory, RuleMeta};
use crate::patterns::regexes::{has_path_traversal, has_shell_metachar, is_nosql_operator, is_sql};
use crate::patterns::request::{is_request_derived, is_route_decorator, is_route_registration};
use crate::tree::{NodeId, NodeKind, SourceTree};

pub static META: RuleMeta = RuleMeta {
    id: "require-input-validation",
    category: RuleCategory::InputValidation,
    default_severity: Severity::Warning,
    description: "Request input must be validated before use.",
    messages: &[
        (
            "missingValidation",
            "Handler '{name}' reads request data without validating it.",
        ),
        (
            "sqlInjectionRisk",
            "Request data is interpolated into an SQL query passed to '{call}'.",
        ),
        (
            "commandInjectionRisk",
            "Request data reaches shell command '{call}'.",
        ),
        (
            "pathTraversalRisk",
            "Request data is used as a file path in '{call}'.",
        ),
        (
            "nosqlInjectionRisk",
            "Request data is used as a query object in '{call}'.",
        ),
    ],
    whole_program: false,
};

const REQUEST_PARAMS: &[&str] = &["req", "request", "ctx", "event"];

/// Framework types that carry the raw request rather than a validated value.
const RAW_PARAM_TYPES: &[&str] = &[
    "request", "response", "any", "object", "unknown", "context", "next", "nextfunction",
    "httprequest", "dict", "str", "string",
];

const SQL_SINKS: &[&str] = &[
    "query", "execute", "executemany", "raw", "$queryRawUnsafe", "$executeRawUnsafe",
    "queryRawUnsafe", "executescript",
];

const COMMAND_SINKS: &[&str] = &[
    "child_process.exec",
    "child_process.execSync",
    "child_process.spawn",
    "exec",
    "execSync",
    "spawn",
    "spawnSync",
    "os.system",
    "os.popen",
    "subprocess.run",
    "subprocess.call",
    "subprocess.Popen",
    "subprocess.check_output",
    "subprocess.check_call",
];

const PATH_SINKS: &[&str] = &[
    "fs.readFile",
    "fs.readFileSync",
    "fs.writeFile",
    "fs.writeFileSync",
    "fs.createReadStream",
    "fs.unlink",
    "res.sendFile",
    "res.download",
    "open",
    "send_file",
    "send_from_directory",
    "os.remove",
    "FileResponse",
];

const NOSQL_SINKS: &[&str] = &[
    "find",
    "findOne",
    "findOneAndUpdate",
    "findOneAndDelete",
    "updateOne",
    "updateMany",
    "deleteOne",
    "deleteMany",
    "countDocuments",
    "aggregate",
    "find_one",
    "update_one",
    "delete_one",
];

/// Calls that strip a path down to a file name.
const FILENAME_GUARDS: &[&str] = &["basename", "secure_filename"];

/// Calls that canonicalize a path. They do not help when the template itself
/// climbs out of the base directory or starts from an absolute path.
const CANONICAL_GUARDS: &[&str] = &["normalize", "resolve"];

pub struct RequireInputValidation;

fn sink_kind(path: &str) -> Option<&'static str> {
    let last = last_segment(path);
    if path.contains('.') && SQL_SINKS.contains(&last) {
        return Some("sqlInjectionRisk");
    }
    if COMMAND_SINKS.iter().any(|s| path == *s || (s.contains('.') && path_is(path, s))) {
        return Some("commandInjectionRisk");
    }
    if PATH_SINKS.iter().any(|s| path == *s || (s.contains('.') && path_is(path, s))) {
        return Some("pathTraversalRisk");
    }
    if path.contains('.') && NOSQL_SINKS.contains(&last) {
        return Some("nosqlInjectionRisk");
    }
    None
}

/// Whether `arg` flows through one of the `guards` calls.
fn path_guarded(tree: &SourceTree, arg: NodeId, guards: &[&str]) -> bool {
    tree.descendants(arg).any(|d| {
        tree.kind(d) == NodeKind::Call
            && tree
                .callee_path(d)
                .is_some_and(|p| guards.contains(&last_segment(&p)))
    })
}

/// String built from parts whose static text matches `pattern`.
fn interpolated_with(tree: &SourceTree, expr: NodeId, pattern: fn(&str) -> bool) -> bool {
    is_interpolated(tree, expr) && pattern(&static_text(tree, expr))
}

/// Whether `expr` or anything nested in it is such a string.
fn builds_string_with(tree: &SourceTree, expr: NodeId, pattern: fn(&str) -> bool) -> bool {
    tree.descendants(expr).any(|d| interpolated_with(tree, d, pattern))
}

impl RequireInputValidation {
    fn is_handler(&self, ctx: &VisitContext<'_>) -> bool {
        let tree = ctx.tree;
        let first_param = tree
            .first_child_of_kind(ctx.node, NodeKind::Parameter)
            .and_then(|p| tree.text(p));
        if first_param.is_some_and(|p| REQUEST_PARAMS.contains(&p)) {
            return true;
        }
        let route_decorated = tree.children(ctx.node).iter().any(|c| {
            tree.kind(*c) == NodeKind::Decorator && tree.text(*c).is_some_and(is_route_decorator)
        });
        route_decorated
            || ctx.direct_call_parent().is_some_and(|call| {
                tree.callee_path(call).is_some_and(|p| is_route_registration(&p))
            })
    }

    /// A parameter typed with an application type (`dto: CreateUserDto`,
    /// `item: Item`) is a schema-validated value object.
    fn has_value_object_param(&self, tree: &SourceTree, function: NodeId) -> bool {
        tree.children(function)
            .iter()
            .filter(|c| tree.kind(**c) == NodeKind::Parameter)
            .filter_map(|p| tree.first_child_of_kind(*p, NodeKind::TypeRef))
            .filter_map(|t| tree.text(t))
            .any(|ty| {
                let base = ty.split(['<', '[', '|']).next().unwrap_or(ty).trim();
                let base = last_segment(base);
                base.chars().next().is_some_and(char::is_uppercase)
                    && !RAW_PARAM_TYPES.contains(&base.to_ascii_lowercase().as_str())
            })
    }

    fn is_validated(&self, ctx: &VisitContext<'_>, function: NodeId) -> bool {
        let tree = ctx.tree;
        let validation = &ctx.patterns.validation_calls;
        if self.has_value_object_param(tree, function)
            || calls_matching(tree, function, validation)
            || scope_has_type_check(tree, function)
        {
            return true;
        }
        let decorated = tree.children(function).iter().any(|c| {
            tree.kind(*c) == NodeKind::Decorator && mentions(tree, *c, validation)
        });
        if decorated {
            return true;
        }
        // Validation middleware on the route: `app.post("/x", validate(s), h)`.
        ctx.direct_call_parent().is_some_and(|call| {
            tree.call_args(call)
                .filter(|a| *a != function)
                .any(|a| mentions(tree, a, validation) || calls_matching(tree, a, validation))
        })
    }

    fn check_function(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        if !self.is_handler(ctx) {
            return;
        }
        let Some(body) = tree.first_child_of_kind(ctx.node, NodeKind::Block) else {
            return;
        };
        if !is_request_derived(tree, body) {
            return;
        }
        if self.is_validated(ctx, ctx.node) {
            return;
        }
        let name = ctx.function_name().unwrap_or("<anonymous>");
        sink.report(
            Finding::at(tree, ctx.node, "missingValidation")
                .with("name", name)
                .fix("Validate the request with a schema (zod, joi, pydantic) before use."),
        );
    }

    fn check_sink(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let Some(path) = tree.callee_path(ctx.node) else {
            return;
        };
        let Some(message_id) = sink_kind(&path) else {
            return;
        };
        let scope = ctx.scope();
        if !is_request_derived(tree, scope) {
            return;
        }
        if calls_matching(tree, scope, &ctx.patterns.validation_calls) {
            return;
        }
        let bound = request_bound_names(tree, scope);
        let args: Vec<NodeId> = tree.call_args(ctx.node).collect();
        let Some(first) = args.first().copied() else {
            return;
        };

        let expr = resolve_local(tree, scope, first);
        let tainted = is_tainted(tree, first, &bound) || is_tainted(tree, expr, &bound);
        let mut shell_chain = false;

        let risky = match message_id {
            "sqlInjectionRisk" => tainted && interpolated_with(tree, expr, is_sql),
            "commandInjectionRisk" => {
                let tainted_args: Vec<NodeId> = args
                    .iter()
                    .copied()
                    .filter(|a| tree.kind(*a) != NodeKind::Property)
                    .filter(|a| {
                        is_tainted(tree, *a, &bound)
                            || is_tainted(tree, resolve_local(tree, scope, *a), &bound)
                    })
                    .collect();
                shell_chain = tainted_args.iter().any(|a| {
                    builds_string_with(tree, resolve_local(tree, scope, *a), has_shell_metachar)
                });
                !tainted_args.is_empty()
            }
            "pathTraversalRisk" => {
                tainted
                    && !path_guarded(tree, expr, FILENAME_GUARDS)
                    && (builds_string_with(tree, expr, has_path_traversal)
                        || !path_guarded(tree, expr, CANONICAL_GUARDS))
            }
            _ => match tree.kind(first) {
                NodeKind::Function => false,
                // `{ user: req.body.user }` accepts `{"$ne": null}` from the client.
                NodeKind::ObjectLiteral => tree.children(first).iter().any(|p| {
                    let Some(value) = tree.property_value(*p) else {
                        return false;
                    };
                    tree.kind(*p) == NodeKind::Property
                        && !tree.kind(value).is_constant()
                        && (is_tainted(tree, value, &bound)
                            || tree.text(*p).is_some_and(is_nosql_operator))
                }),
                _ => is_tainted(tree, first, &bound),
            },
        };
        if risky {
            let mut finding = Finding::at(tree, ctx.node, message_id)
                .with("call", path.as_str())
                .fix(match message_id {
                    "sqlInjectionRisk" => "Use parameterized queries.",
                    "commandInjectionRisk" => "Pass arguments as an array without a shell, after validating them.",
                    "pathTraversalRisk" => "Resolve the path against a fixed base and reject '..'.",
                    _ => "Cast request values to primitives before building the query.",
                });
            // Request data spliced into a chained shell line runs as commands.
            if shell_chain {
                finding = finding.severity(Severity::Error);
            }
            sink.report(finding);
        }
    }
}

impl Rule for RequireInputValidation {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::Function, NodeKind::Call]
    }

    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        match ctx.kind() {
            NodeKind::Function => self.check_function(ctx, sink),
            _ => self.check_sink(ctx, sink),
        }
    }
}
