//! `no-sensitive-data-leak`: sensitive values in logs, insecure storage and
//! responses.

use aegis_core::types::Severity;

use super::common::{bool_value, call_option, calls_matching, last_segment, object_segment};
use super::context::VisitContext;
use super::finding::{Finding, FindingSink};
use super::traits::{Rule, RuleCategory, RuleMeta};
use crate::tree::{NodeId, NodeKind, SourceTree};

pub static META: RuleMeta = RuleMeta {
    id: "no-sensitive-data-leak",
    category: RuleCategory::DataLeak,
    default_severity: Severity::Warning,
    description: "Sensitive data must not be logged, stored insecurely, or returned unmasked.",
    messages: &[
        ("sensitiveLogged", "Sensitive value '{field}' is written to the log."),
        (
            "insecureStorage",
            "Sensitive value '{field}' is stored with '{call}', which is not a secure store.",
        ),
        (
            "unmaskedAccess",
            "Sensitive field '{field}' is returned without masking.",
        ),
    ],
    whole_program: false,
};

/// Receivers whose `log`/`info`/... methods write logs.
const LOGGER_OBJECTS: &[&str] = &["console", "logger", "log", "logging", "winston", "pino", "bunyan"];

/// Calls that send their arguments to the client.
const RESPONSE_CALLS: &[&str] = &[
    "json",
    "send",
    "jsonify",
    "render",
    "write",
    "end",
    "JsonResponse",
    "Response",
    "make_response",
];

const COMPARISON_OPERATORS: &[&str] = &["==", "===", "!=", "!==", "in", "not in", "is", "is not"];

pub struct NoSensitiveDataLeak;

/// First sensitive name referenced in `id` that is not wrapped in a masking
/// call.
fn unmasked_sensitive_name<'t>(ctx: &VisitContext<'t>, id: NodeId) -> Option<&'t str> {
    let tree = ctx.tree;
    if tree.kind(id).is_call_like()
        && tree
            .callee_path(id)
            .is_some_and(|p| ctx.patterns.masking_calls.matches(&p))
    {
        return None;
    }
    match tree.kind(id) {
        NodeKind::Identifier | NodeKind::Member => {
            if let Some(name) = tree.text(id).filter(|n| ctx.patterns.is_sensitive_field(n)) {
                return Some(name);
            }
        }
        NodeKind::Property => {
            if let Some(name) = tree.text(id).filter(|n| ctx.patterns.is_sensitive_field(n)) {
                if tree
                    .property_value(id)
                    .is_some_and(|v| !tree.kind(v).is_constant())
                {
                    return Some(name);
                }
            }
        }
        _ => {}
    }
    let children = tree.children(id);
    // A call's callee names the operation, not the value.
    let skip = usize::from(tree.kind(id).is_call_like());
    children
        .iter()
        .skip(skip)
        .find_map(|c| unmasked_sensitive_name(ctx, *c))
}

fn is_logger_call(path: &str, ctx: &VisitContext<'_>) -> bool {
    let last = last_segment(path);
    if !ctx.patterns.log_calls.matches_exactly(last) {
        return false;
    }
    match object_segment(path) {
        Some(object) => {
            let object = object.to_ascii_lowercase();
            LOGGER_OBJECTS.iter().any(|l| object == *l || object.ends_with("logger"))
        }
        None => last == "print",
    }
}

impl NoSensitiveDataLeak {
    fn check_log(&self, ctx: &VisitContext<'_>, path: &str, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let field = tree
            .call_args(ctx.node)
            .find_map(|a| unmasked_sensitive_name(ctx, a));
        if let Some(field) = field {
            sink.report(
                Finding::at(tree, ctx.node, "sensitiveLogged")
                    .with("field", field)
                    .with("call", path)
                    .fix("Remove the value from the log or mask it first."),
            );
        }
    }

    fn check_storage(&self, ctx: &VisitContext<'_>, path: &str, sink: &mut FindingSink) {
        let tree = ctx.tree;
        if ctx.patterns.approved_storage.matches(path) {
            return;
        }
        let args: Vec<NodeId> = tree.call_args(ctx.node).collect();
        let is_cookie = last_segment(path) == "cookie";
        if is_cookie && cookie_is_protected(tree, ctx.node) {
            return;
        }
        // `setItem("token", value)`: the key names the value.
        let keyed = args
            .first()
            .and_then(|k| tree.string_value(*k))
            .filter(|k| ctx.patterns.is_sensitive_field(k));
        let field = keyed.or_else(|| {
            args.iter()
                .filter(|a| tree.kind(**a) != NodeKind::ObjectLiteral || !is_cookie)
                .find_map(|a| unmasked_sensitive_name(ctx, *a))
        });
        let Some(field) = field else {
            return;
        };
        if args.iter().skip(1).any(|a| {
            tree.kind(*a).is_call_like() && calls_matching(tree, *a, &ctx.patterns.masking_calls)
        }) {
            return;
        }
        sink.report(
            Finding::at(tree, ctx.node, "insecureStorage")
                .with("field", field)
                .with("call", path)
                .fix(if is_cookie {
                    "Set httpOnly and secure on the cookie."
                } else {
                    "Store secrets in a secure store (keychain, vault) or encrypt them."
                }),
        );
    }

    fn check_call(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let Some(path) = ctx.tree.callee_path(ctx.node) else {
            return;
        };
        if is_logger_call(&path, ctx) {
            self.check_log(ctx, &path, sink);
        } else if ctx.patterns.storage_calls.matches(&path) {
            self.check_storage(ctx, &path, sink);
        }
    }

    /// `return user.password`, `res.json({ ssn: user.ssn })`.
    fn check_member(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let Some(field) = ctx.text().filter(|f| ctx.patterns.is_sensitive_field(f)) else {
            return;
        };
        let mut child = ctx.node;
        for ancestor in ctx.ancestors.iter().rev().copied() {
            match tree.kind(ancestor) {
                NodeKind::Return => break,
                NodeKind::ObjectLiteral
                | NodeKind::Property
                | NodeKind::ArrayLiteral
                | NodeKind::Conditional
                | NodeKind::TemplateLiteral => {}
                NodeKind::BinaryOp => {
                    if tree
                        .text(ancestor)
                        .is_some_and(|op| COMPARISON_OPERATORS.contains(&op))
                    {
                        return;
                    }
                }
                NodeKind::Call | NodeKind::New => {
                    if tree.callee(ancestor) == Some(child) {
                        return;
                    }
                    let is_response = tree
                        .callee_path(ancestor)
                        .is_some_and(|p| RESPONSE_CALLS.contains(&last_segment(&p)));
                    if is_response {
                        break;
                    }
                    // Passed to something else, masking or not.
                    return;
                }
                _ => return,
            }
            child = ancestor;
        }
        sink.report(
            Finding::at(tree, ctx.node, "unmaskedAccess")
                .with("field", field)
                .fix("Omit the field from the response or mask it."),
        );
    }
}

/// `res.cookie(name, value, { httpOnly: true, secure: true })`.
fn cookie_is_protected(tree: &SourceTree, call: NodeId) -> bool {
    let flag = |key: &str| {
        call_option(tree, call, key)
            .and_then(|p| tree.property_value(p))
            .and_then(|v| bool_value(tree, v))
            == Some(true)
    };
    (flag("httpOnly") || flag("httponly")) && flag("secure")
}

impl Rule for NoSensitiveDataLeak {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::Call, NodeKind::Member]
    }

    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        match ctx.kind() {
            NodeKind::Call => self.check_call(ctx, sink),
            _ => self.check_member(ctx, sink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::run_rule;
    use crate::tree::{Language, TreeBuilder};

    fn message_ids(findings: &[Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.message_id).collect()
    }

    #[test]
    fn test_password_logged() {
        let mut b = TreeBuilder::new();
        let msg = b.string("login attempt");
        let pw = b.ident("password");
        let call = b.call_path("console.log", vec![msg, pw]);
        let unit = b.unit("auth.js", Language::JavaScript, vec![call]);

        let findings = run_rule(&NoSensitiveDataLeak, &unit);
        assert_eq!(message_ids(&findings), vec!["sensitiveLogged"]);
        assert_eq!(findings[0].data[0].1, "password");
    }

    #[test]
    fn test_masked_log_is_clean() {
        let mut b = TreeBuilder::new();
        let ssn = b.ident("ssn");
        let masked = b.call_path("maskSsn", vec![ssn]);
        let call = b.call_path("logger.info", vec![masked]);
        let unit = b.unit("audit.ts", Language::TypeScript, vec![call]);

        assert!(run_rule(&NoSensitiveDataLeak, &unit).is_empty());
    }

    #[test]
    fn test_math_log_is_not_logging() {
        let mut b = TreeBuilder::new();
        let token = b.ident("tokenCount");
        let call = b.call_path("Math.log", vec![token]);
        let unit = b.unit("stats.js", Language::JavaScript, vec![call]);

        assert!(run_rule(&NoSensitiveDataLeak, &unit).is_empty());
    }

    #[test]
    fn test_token_in_local_storage() {
        let mut b = TreeBuilder::new();
        let key = b.string("authToken");
        let value = b.ident("jwt");
        let call = b.call_path("localStorage.setItem", vec![key, value]);
        let unit = b.unit("client.js", Language::JavaScript, vec![call]);

        let findings = run_rule(&NoSensitiveDataLeak, &unit);
        assert_eq!(message_ids(&findings), vec!["insecureStorage"]);
    }

    #[test]
    fn test_unmasked_field_in_response() {
        let mut b = TreeBuilder::new();
        let user = b.ident("user");
        let pw = b.member(user, "password");
        let prop = b.prop("password", pw);
        let body = b.object(vec![prop]);
        let call = b.call_path("res.json", vec![body]);
        let unit = b.unit("users.js", Language::JavaScript, vec![call]);

        let findings = run_rule(&NoSensitiveDataLeak, &unit);
        assert_eq!(message_ids(&findings), vec!["unmaskedAccess"]);
    }

    #[test]
    fn test_password_comparison_is_clean() {
        let mut b = TreeBuilder::new();
        let user = b.ident("user");
        let pw = b.member(user, "password");
        let input = b.ident("hashed");
        let cmp = b.binary("===", pw, input);
        let ret = b.ret(cmp);
        let unit = b.unit("users.js", Language::JavaScript, vec![ret]);

        assert!(run_rule(&NoSensitiveDataLeak, &unit).is_empty());
    }
}
