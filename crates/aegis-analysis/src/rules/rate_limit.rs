//! `require-rate-limit`: routes without throttling, and projects without
//! any rate limiting at all.

use aegis_core::types::Severity;

use super::common::{calls_matching, mentions};
use super::context::{ReduceContext, VisitContext};
use super::finding::{Finding, FindingSink};
use super::traits::{Rule, RuleCategory, RuleMeta};
use crate::patterns::request::{is_route_decorator, is_route_registration, route_path};
use crate::tree::{NodeId, NodeKind, Span};

pub static META: RuleMeta = RuleMeta {
    id: "require-rate-limit",
    category: RuleCategory::RateLimiting,
    default_severity: Severity::Warning,
    description: "Routes should be rate limited, and the project should configure a limiter.",
    messages: &[
        (
            "missingRateLimit",
            "Route '{route}' has no rate-limiting middleware or decorator.",
        ),
        (
            "noGlobalLimit",
            "No rate limiting is configured anywhere in the scanned code.",
        ),
    ],
    whole_program: true,
};

const FACT_UNIT: &str = "unit";
const FACT_CONFIGURED: &str = "configured";

pub struct RequireRateLimit;

impl RequireRateLimit {
    fn file_limited(ctx: &VisitContext<'_>) -> bool {
        ctx.file.registers_globally(ctx.tree, &ctx.patterns.rate_limit)
    }

    fn check_program(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        sink.record(FACT_UNIT, ctx.unit.path.as_str());
        let rate_limit = &ctx.patterns.rate_limit;
        if ctx.file.imports_any(rate_limit)
            || ctx.file.calls_any(rate_limit)
            || ctx.file.decorators.iter().any(|(_, d)| rate_limit.matches(d))
            || Self::file_limited(ctx)
        {
            sink.record(FACT_CONFIGURED, ctx.unit.path.as_str());
        }
    }

    fn check_route_call(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
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
        let limited = tree
            .call_args(ctx.node)
            .any(|a| tree.kind(a) != NodeKind::Function && mentions(tree, a, &ctx.patterns.rate_limit))
            || calls_limiter(ctx, ctx.node);
        if limited || Self::file_limited(ctx) {
            return;
        }
        sink.report(
            Finding::at(tree, ctx.node, "missingRateLimit")
                .with("route", route)
                .fix("Add a rate-limiting middleware to the route or the app."),
        );
    }

    fn check_decorated_route(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let decorators: Vec<NodeId> = tree
            .children(ctx.node)
            .iter()
            .copied()
            .filter(|c| tree.kind(*c) == NodeKind::Decorator)
            .collect();
        let Some(route_decorator) = decorators
            .iter()
            .copied()
            .find(|d| tree.text(*d).is_some_and(is_route_decorator))
        else {
            return;
        };
        let limited = decorators
            .iter()
            .any(|d| mentions(tree, *d, &ctx.patterns.rate_limit));
        if limited || Self::file_limited(ctx) {
            return;
        }
        let route = tree
            .first_child_of_kind(route_decorator, NodeKind::Call)
            .and_then(|call| route_path(tree, call))
            .or_else(|| tree.text(route_decorator))
            .unwrap_or_default();
        sink.report(
            Finding::at(tree, route_decorator, "missingRateLimit")
                .with("route", route)
                .fix("Add a rate-limit decorator such as @limiter.limit(\"10/minute\")."),
        );
    }
}

/// Handler body that consults a limiter itself (`await limiter.consume(ip)`).
fn calls_limiter(ctx: &VisitContext<'_>, call: NodeId) -> bool {
    let tree = ctx.tree;
    tree.call_args(call)
        .filter(|a| tree.kind(*a) == NodeKind::Function)
        .any(|f| calls_matching(tree, f, &ctx.patterns.rate_limit))
}

impl Rule for RequireRateLimit {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::Program, NodeKind::Call, NodeKind::Function]
    }

    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        match ctx.kind() {
            NodeKind::Program => self.check_program(ctx, sink),
            NodeKind::Call => self.check_route_call(ctx, sink),
            _ => self.check_decorated_route(ctx, sink),
        }
    }

    fn reduce(&self, ctx: &ReduceContext<'_>, sink: &mut FindingSink) {
        if !ctx.has_fact(FACT_UNIT) || ctx.has_fact(FACT_CONFIGURED) {
            return;
        }
        // A limiter may sit in a unit this rule never fully saw.
        if ctx.units_partial > 0 {
            tracing::debug!(units_partial = ctx.units_partial, "global rate-limit verdict skipped");
            return;
        }
        sink.report(
            Finding::new("noGlobalLimit", Span::synthetic())
                .fix("Install a limiter app-wide (express-rate-limit, slowapi, flask-limiter)."),
        );
    }
}
