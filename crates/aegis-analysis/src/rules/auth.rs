//! `require-auth-check`: sensitive functions and routes must be guarded.
//!
//! Guards are recognized heuristically: a call to a known auth-check
//! function in the body, an auth decorator on the function or its class, a
//! check of the request's user in a conditional, auth middleware on the
//! route, an app-wide `use(auth)`, or a leading comment marking the function
//! as protected or intentionally public.

use aegis_core::types::Severity;

use super::common::{calls_matching, mentions};
use super::context::VisitContext;
use super::finding::{Finding, FindingSink};
use super::traits::{Rule, RuleCategory, RuleMeta};
use crate::patterns::request::{is_route_decorator, is_route_registration, route_path};
use crate::patterns::{normalize_name, KeywordSet};
use crate::tree::{NodeId, NodeKind};

pub static META: RuleMeta = RuleMeta {
    id: "require-auth-check",
    category: RuleCategory::Authn,
    default_severity: Severity::Warning,
    description: "Sensitive operations and routes must verify the caller's identity.",
    messages: &[
        (
            "missingAuthCheck",
            "'{name}' performs a sensitive operation ({operation}) without an authentication check.",
        ),
        (
            "missingRouteAuth",
            "Route '{route}' is registered without authentication middleware.",
        ),
    ],
    whole_program: false,
};

const AUTH_DECORATORS: &[&str] = &[
    "useguards",
    "authguard",
    "authenticated",
    "requiresauth",
    "preauthorize",
    "secured",
    "roles",
    "jwtrequired",
    "loginrequired",
    "permissionrequired",
    "authorize",
];

/// Leading-comment markers for protected or intentionally public functions.
const AUTH_COMMENT_MARKERS: &[&str] = &[
    "@auth",
    "requiresauth",
    "authrequired",
    "authenticated",
    "@protected",
    "@public",
    "publicendpoint",
];

/// Operations that are public by nature.
const PUBLIC_OPERATIONS: &[&str] = &[
    "login",
    "logout",
    "signin",
    "signup",
    "signout",
    "register",
    "forgotpassword",
    "resetpassword",
    "healthcheck",
];

const REQUEST_USER_PATHS: &[&str] = &[
    "req.user",
    "req.auth",
    "req.session.user",
    "request.user",
    "request.auth",
    "ctx.state.user",
    "current_user",
    "g.user",
];

pub struct RequireAuthCheck {
    decorators: KeywordSet,
    public: KeywordSet,
}

impl RequireAuthCheck {
    pub fn new() -> Self {
        Self {
            decorators: KeywordSet::new(AUTH_DECORATORS),
            public: KeywordSet::new(PUBLIC_OPERATIONS),
        }
    }

    fn is_auth_name(ctx: &VisitContext<'_>, name: &str) -> bool {
        ctx.patterns.auth_checks.matches(name) || normalize_name(name).contains("auth")
    }

    fn decorated_with_auth(&self, ctx: &VisitContext<'_>, owner: NodeId) -> bool {
        let tree = ctx.tree;
        tree.children(owner)
            .iter()
            .filter(|c| tree.kind(**c) == NodeKind::Decorator)
            .any(|d| mentions(tree, *d, &self.decorators) || mentions(tree, *d, &ctx.patterns.auth_checks))
    }

    fn has_auth_comment(ctx: &VisitContext<'_>) -> bool {
        let tree = ctx.tree;
        ctx.preceding_siblings()
            .iter()
            .rev()
            .take_while(|s| tree.kind(**s) == NodeKind::Comment)
            .filter_map(|s| tree.text(*s))
            .any(|text| {
                let lowered = text.to_ascii_lowercase().replace([' ', '-', '_'], "");
                AUTH_COMMENT_MARKERS.iter().any(|m| lowered.contains(m))
            })
    }

    fn checks_request_user(ctx: &VisitContext<'_>) -> bool {
        let tree = ctx.tree;
        tree.descendants(ctx.node).any(|d| {
            matches!(tree.kind(d), NodeKind::If | NodeKind::Conditional)
                && tree.child(d, 0).is_some_and(|cond| {
                    tree.descendants(cond).any(|c| {
                        matches!(tree.kind(c), NodeKind::Member | NodeKind::Identifier)
                            && tree.dotted_path(c).is_some_and(|p| {
                                REQUEST_USER_PATHS
                                    .iter()
                                    .any(|u| p == *u || p.starts_with(&format!("{u}.")))
                            })
                    })
                })
        })
    }

    /// The function is an inline handler of a route call that carries auth
    /// middleware.
    fn route_has_middleware(ctx: &VisitContext<'_>) -> bool {
        let tree = ctx.tree;
        let Some(call) = ctx.direct_call_parent() else {
            return false;
        };
        tree.callee_path(call)
            .is_some_and(|p| is_route_registration(&p))
            && tree
                .call_args(call)
                .filter(|a| *a != ctx.node)
                .any(|a| tree.referenced_names(a).any(|n| Self::is_auth_name(ctx, n)))
    }

    fn is_guarded(&self, ctx: &VisitContext<'_>) -> bool {
        let tree = ctx.tree;
        calls_matching(tree, ctx.node, &ctx.patterns.auth_checks)
            || self.decorated_with_auth(ctx, ctx.node)
            || ctx
                .nearest(NodeKind::Class)
                .is_some_and(|class| self.decorated_with_auth(ctx, class))
            || Self::checks_request_user(ctx)
            || Self::route_has_middleware(ctx)
            || Self::has_auth_comment(ctx)
            || ctx.file.registers_globally(tree, &ctx.patterns.auth_checks)
    }

    fn check_function(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let name = ctx.function_name();

        let trigger = name.and_then(|name| {
            if self.public.matches(name) || ctx.patterns.auth_checks.matches(name) {
                return None;
            }
            if let Some(op) = ctx.patterns.sensitive_operations.find(name) {
                Some((name, op, Severity::Error))
            } else {
                ctx.patterns
                    .handler_markers
                    .find(name)
                    .map(|h| (name, h, Severity::Warning))
            }
        });

        if let Some((name, operation, severity)) = trigger {
            if !self.is_guarded(ctx) {
                sink.report(
                    Finding::at(tree, ctx.node, "missingAuthCheck")
                        .with("name", name)
                        .with("operation", operation)
                        .severity(severity)
                        .fix("Call an authentication check or add an auth guard."),
                );
            }
            return;
        }

        // Decorator-registered routes (`@app.route("/admin")`) on functions
        // whose name says nothing.
        if name.is_some_and(|n| self.public.matches(n)) {
            return;
        }
        for decorator in tree
            .children(ctx.node)
            .iter()
            .copied()
            .filter(|c| tree.kind(*c) == NodeKind::Decorator)
        {
            if !tree.text(decorator).is_some_and(is_route_decorator) {
                continue;
            }
            let route = tree
                .first_child_of_kind(decorator, NodeKind::Call)
                .and_then(|call| route_path(tree, call));
            if let Some(route) = route {
                if ctx.patterns.sensitive_operations.matches(route) && !self.is_guarded(ctx) {
                    sink.report(
                        Finding::at(tree, decorator, "missingRouteAuth")
                            .with("route", route)
                            .fix("Add an authentication decorator to the route."),
                    );
                }
            }
        }
    }

    fn check_route(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        if ctx.nearest(NodeKind::Decorator).is_some() {
            return;
        }
        let Some(path) = tree.callee_path(ctx.node) else {
            return;
        };
        if !is_route_registration(&path) {
            return;
        }
        let Some(route) = route_path(tree, ctx.node) else {
            return;
        };
        if !ctx.patterns.sensitive_operations.matches(route) || self.public.matches(route) {
            return;
        }
        let args: Vec<NodeId> = tree.call_args(ctx.node).collect();
        // Path first, handler last; anything between is middleware.
        let middleware = args.get(1..args.len().saturating_sub(1)).unwrap_or(&[]);
        let guarded = middleware
            .iter()
            .any(|m| tree.referenced_names(*m).any(|n| Self::is_auth_name(ctx, n)))
            || ctx.file.registers_globally(tree, &ctx.patterns.auth_checks);
        if !guarded {
            sink.report(
                Finding::at(tree, ctx.node, "missingRouteAuth")
                    .with("route", route)
                    .fix("Add authentication middleware before the handler."),
            );
        }
    }
}

impl Default for RequireAuthCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for RequireAuthCheck {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::Function, NodeKind::Call]
    }

    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        match ctx.kind() {
            NodeKind::Function => self.check_function(ctx, sink),
            _ => self.check_route(ctx, sink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::run_rule;
    use crate::tree::{Language, SourceUnit, TreeBuilder};

    fn handler(guarded: bool) -> SourceUnit {
        let mut b = TreeBuilder::new();
        let req = b.param("req");
        let res = b.param("res");
        let mut body = Vec::new();
        if guarded {
            let r = b.ident("req");
            body.push(b.call_path("requireAuth", vec![r]));
        }
        let id = b.path("req.params.id");
        body.push(b.call_path("db.users.find", vec![id]));
        let f = b.function(Some("getUserHandler"), vec![req, res], vec![], body);
        b.unit("users.js", Language::JavaScript, vec![f])
    }

    #[test]
    fn test_unguarded_sensitive_handler() {
        let findings = run_rule(&RequireAuthCheck::new(), &handler(false));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message_id, "missingAuthCheck");
        assert_eq!(findings[0].severity, Some(Severity::Error));
        assert_eq!(findings[0].data[0].1, "getUserHandler");
    }

    #[test]
    fn test_auth_call_guards_handler() {
        assert!(run_rule(&RequireAuthCheck::new(), &handler(true)).is_empty());
    }

    #[test]
    fn test_public_operation_is_exempt() {
        let mut b = TreeBuilder::new();
        let f = b.function(Some("loginHandler"), vec![], vec![], vec![]);
        let unit = b.unit("auth.js", Language::JavaScript, vec![f]);
        assert!(run_rule(&RequireAuthCheck::new(), &unit).is_empty());
    }

    #[test]
    fn test_decorator_guards_handler() {
        let mut b = TreeBuilder::new();
        let dec = b.decorator("login_required", vec![]);
        let f = b.function(Some("update_account"), vec![], vec![dec], vec![]);
        let unit = b.unit("views.py", Language::Python, vec![f]);
        assert!(run_rule(&RequireAuthCheck::new(), &unit).is_empty());
    }

    #[test]
    fn test_leading_comment_marks_public() {
        let mut b = TreeBuilder::new();
        let comment = b.comment("// @public status page for account owners");
        b.line(2);
        let f = b.function(Some("accountStatus"), vec![], vec![], vec![]);
        let unit = b.unit("status.js", Language::JavaScript, vec![comment, f]);
        assert!(run_rule(&RequireAuthCheck::new(), &unit).is_empty());
    }

    #[test]
    fn test_route_with_and_without_middleware() {
        let mut b = TreeBuilder::new();
        let open_path = b.string("/admin/users");
        let open_handler = b.ident("listUsers");
        let open = b.call_path("router.get", vec![open_path, open_handler]);
        b.line(2);
        let guarded_path = b.string("/admin/settings");
        let mw = b.ident("requireAuth");
        let guarded_handler = b.ident("showSettings");
        let guarded = b.call_path("router.get", vec![guarded_path, mw, guarded_handler]);
        let unit = b.unit("admin.js", Language::JavaScript, vec![open, guarded]);

        let findings = run_rule(&RequireAuthCheck::new(), &unit);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message_id, "missingRouteAuth");
        assert_eq!(findings[0].data[0].1, "/admin/users");
        assert_eq!(findings[0].span.start_line, 1);
    }
}
