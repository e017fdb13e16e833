//! `require-security-headers`: header configuration objects, `helmet`
//! and `Talisman` options, and single `setHeader` calls.

use aegis_core::types::Severity;

use super::common::{bool_value, call_option, last_segment, number_value, path_is};
use super::context::VisitContext;
use super::finding::{Finding, FindingSink};
use super::traits::{Rule, RuleCategory, RuleMeta};
use crate::patterns::normalize_name;
use crate::tree::{NodeId, NodeKind, SourceTree};

pub static META: RuleMeta = RuleMeta {
    id: "require-security-headers",
    category: RuleCategory::Headers,
    default_severity: Severity::Warning,
    description: "Responses should carry strict security headers.",
    messages: &[
        ("missingHeader", "Security header '{header}' is not configured."),
        ("weakHeaderValue", "Header '{header}' has a weak value '{value}'."),
        (
            "unsafeCspSource",
            "CSP directive '{directive}' allows unsafe source {source}.",
        ),
        (
            "cspMissingNonce",
            "CSP '{directive}' uses neither nonces nor hashes for scripts.",
        ),
        ("cspMissingDirective", "CSP is missing the '{directive}' directive."),
        (
            "missingReportEndpoint",
            "CSP has no report-uri or report-to endpoint for violations.",
        ),
        ("headerDisabled", "Security header '{header}' is explicitly disabled."),
    ],
    whole_program: false,
};

const HSTS: &str = "Strict-Transport-Security";
const CSP: &str = "Content-Security-Policy";
const XCTO: &str = "X-Content-Type-Options";
const XFO: &str = "X-Frame-Options";
const REFERRER: &str = "Referrer-Policy";
const PERMISSIONS: &str = "Permissions-Policy";
const ACAO: &str = "Access-Control-Allow-Origin";

/// Headers every header configuration is expected to set.
const SECURITY_HEADERS: &[&str] = &[HSTS, CSP, XCTO, XFO, REFERRER, PERMISSIONS];

/// One year.
pub const MIN_HSTS_MAX_AGE: f64 = 31_536_000.0;

const CORE_CSP_DIRECTIVES: &[&str] = &["default-src", "object-src", "base-uri"];
const UNSAFE_CSP_SOURCES: &[&str] = &["'unsafe-inline'", "'unsafe-eval'", "*", "data:"];
const SCRIPT_DIRECTIVES: &[&str] = &["script-src", "default-src", "object-src"];

/// `helmet` option keys and the header each controls.
const HELMET_OPTIONS: &[(&str, &str)] = &[
    ("contentSecurityPolicy", CSP),
    ("hsts", HSTS),
    ("strictTransportSecurity", HSTS),
    ("frameguard", XFO),
    ("xFrameOptions", XFO),
    ("noSniff", XCTO),
    ("xContentTypeOptions", XCTO),
    ("referrerPolicy", REFERRER),
];

/// `Talisman` keyword arguments that switch a protection off when falsy.
const TALISMAN_TOGGLES: &[(&str, &str)] = &[
    ("force_https", HSTS),
    ("strict_transport_security", HSTS),
    ("content_security_policy", CSP),
    ("frame_options", XFO),
    ("referrer_policy", REFERRER),
];

const HEADER_SETTERS: &[&str] = &["setHeader", "set", "header", "append", "add_header"];

pub struct RequireSecurityHeaders;

/// Canonical header for a key such as `x-frame-options` or `X_FRAME_OPTIONS`.
fn canonical_header(key: &str) -> Option<&'static str> {
    let normalized = normalize_name(key);
    SECURITY_HEADERS
        .iter()
        .chain(std::iter::once(&ACAO))
        .copied()
        .find(|h| normalize_name(h) == normalized)
}

/// Whether a header value is weak.
fn weak_value(header: &str, value: &str) -> bool {
    let value = value.trim();
    match header {
        HSTS => hsts_max_age(value).map_or(true, |age| age < MIN_HSTS_MAX_AGE),
        XFO => !value.eq_ignore_ascii_case("deny") && !value.eq_ignore_ascii_case("sameorigin"),
        XCTO => !value.eq_ignore_ascii_case("nosniff"),
        REFERRER => {
            value.eq_ignore_ascii_case("unsafe-url")
                || value.eq_ignore_ascii_case("no-referrer-when-downgrade")
        }
        ACAO => value == "*",
        PERMISSIONS => grants_any_origin(value),
        _ => false,
    }
}

/// A `Permissions-Policy` feature whose allowlist contains `*`:
/// `camera=*`, `geolocation=(self *)`.
fn grants_any_origin(policy: &str) -> bool {
    policy.split(',').any(|directive| {
        let Some((_, allowlist)) = directive.split_once('=') else {
            return false;
        };
        allowlist
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split_whitespace()
            .any(|origin| origin == "*")
    })
}

fn hsts_max_age(value: &str) -> Option<f64> {
    value.split(';').find_map(|part| {
        let (key, age) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("max-age")
            .then(|| age.trim().parse().ok())?
    })
}

/// `scriptSrc` -> `script-src`; already-kebab keys pass through.
fn kebab(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else if c == '_' {
            out.push('-');
        } else {
            out.push(c);
        }
    }
    out
}

/// Parsed CSP: `(directive, sources, node)` triples.
type Directives = Vec<(String, Vec<String>, NodeId)>;

fn directives_from_string(text: &str, node: NodeId) -> Directives {
    text.split(';')
        .filter_map(|part| {
            let mut words = part.split_whitespace();
            let name = words.next()?.to_ascii_lowercase();
            Some((name, words.map(str::to_string).collect(), node))
        })
        .collect()
}

fn directives_from_object(tree: &SourceTree, object: NodeId) -> Directives {
    let mut out = Vec::new();
    for prop in tree.children(object).iter().copied() {
        if tree.kind(prop) != NodeKind::Property {
            continue;
        }
        let Some(key) = tree.text(prop) else {
            continue;
        };
        let mut sources = Vec::new();
        if let Some(value) = tree.property_value(prop) {
            match tree.kind(value) {
                NodeKind::ArrayLiteral => {
                    for item in tree.children(value).iter().copied() {
                        match tree.string_value(item) {
                            Some(s) => sources.extend(s.split_whitespace().map(str::to_string)),
                            // Callbacks produce per-request nonces.
                            None if tree.kind(item) == NodeKind::Function => {
                                sources.push("'nonce-'".to_string())
                            }
                            None => {}
                        }
                    }
                }
                _ => {
                    if let Some(s) = tree.string_value(value) {
                        sources.extend(s.split_whitespace().map(str::to_string));
                    }
                }
            }
        }
        out.push((kebab(key), sources, prop));
    }
    out
}

impl RequireSecurityHeaders {
    fn report_missing(&self, tree: &SourceTree, at: NodeId, header: &str, sink: &mut FindingSink) {
        sink.report(
            Finding::at(tree, at, "missingHeader")
                .with("header", header)
                .fix(format!("Set the {header} header.")),
        );
    }

    fn report_disabled(&self, tree: &SourceTree, at: NodeId, header: &str, sink: &mut FindingSink) {
        sink.report(
            Finding::at(tree, at, "headerDisabled")
                .with("header", header)
                .fix(format!("Re-enable {header}.")),
        );
    }

    fn report_weak(
        &self,
        tree: &SourceTree,
        at: NodeId,
        header: &str,
        value: &str,
        sink: &mut FindingSink,
    ) {
        sink.report(
            Finding::at(tree, at, "weakHeaderValue")
                .with("header", header)
                .with("value", value)
                .fix(match header {
                    HSTS => "Use max-age=31536000; includeSubDomains.".to_string(),
                    XFO => "Use DENY or SAMEORIGIN.".to_string(),
                    XCTO => "Use nosniff.".to_string(),
                    ACAO => "Allow specific origins instead of '*'.".to_string(),
                    PERMISSIONS => "Limit each feature to () or self.".to_string(),
                    _ => format!("Use a stricter {header} value."),
                }),
        );
    }

    /// Checks shared by every CSP source. `report_endpoint` is true when the
    /// endpoint is configured outside the directives (`reportUri` options).
    fn check_csp(
        &self,
        tree: &SourceTree,
        at: NodeId,
        directives: &Directives,
        report_endpoint: bool,
        sink: &mut FindingSink,
    ) {
        let find = |name: &str| directives.iter().find(|(d, _, _)| d == name);

        for (directive, sources, node) in directives {
            if !SCRIPT_DIRECTIVES.contains(&directive.as_str()) {
                continue;
            }
            for source in sources {
                if UNSAFE_CSP_SOURCES.iter().any(|u| source.eq_ignore_ascii_case(u)) {
                    sink.report(
                        Finding::at(tree, *node, "unsafeCspSource")
                            .with("directive", directive.as_str())
                            .with("source", source.as_str())
                            .fix("Remove the source; use nonces or hashes for inline scripts."),
                    );
                }
            }
        }

        if let Some((directive, sources, node)) = find("script-src").or_else(|| find("default-src")) {
            let has_nonce = sources.iter().any(|s| {
                let s = s.trim_matches('\'');
                s.starts_with("nonce-")
                    || s.starts_with("sha256-")
                    || s.starts_with("sha384-")
                    || s.starts_with("sha512-")
                    || s == "strict-dynamic"
            });
            if !has_nonce {
                sink.report(
                    Finding::at(tree, *node, "cspMissingNonce")
                        .with("directive", directive.as_str())
                        .fix("Add a per-request 'nonce-…' source."),
                );
            }
        }

        for core in CORE_CSP_DIRECTIVES {
            if find(*core).is_none() {
                sink.report(
                    Finding::at(tree, at, "cspMissingDirective")
                        .with("directive", *core)
                        .fix(format!("Add {core} 'none' or 'self'.")),
                );
            }
        }

        if !report_endpoint && find("report-uri").is_none() && find("report-to").is_none() {
            sink.report(
                Finding::at(tree, at, "missingReportEndpoint")
                    .fix("Add report-uri or report-to so violations are collected."),
            );
        }
    }

    fn check_csp_value(&self, tree: &SourceTree, value: NodeId, sink: &mut FindingSink) {
        if let Some(text) = tree.string_value(value) {
            let directives = directives_from_string(text, value);
            self.check_csp(tree, value, &directives, false, sink);
        } else if tree.kind(value) == NodeKind::ObjectLiteral {
            // helmet nests the directives one level down.
            let (object, report) = match tree.property(value, "directives") {
                Some(prop) => (
                    tree.property_value(prop).unwrap_or(value),
                    tree.property(value, "reportUri").is_some(),
                ),
                None => (value, false),
            };
            let directives = directives_from_object(tree, object);
            self.check_csp(tree, value, &directives, report, sink);
        }
    }

    fn check_header_value(
        &self,
        tree: &SourceTree,
        header: &'static str,
        value: NodeId,
        sink: &mut FindingSink,
    ) {
        if header == CSP {
            self.check_csp_value(tree, value, sink);
            return;
        }
        if bool_value(tree, value) == Some(false) {
            self.report_disabled(tree, value, header, sink);
            return;
        }
        if let Some(text) = tree.string_value(value) {
            if weak_value(header, text) {
                self.report_weak(tree, value, header, text, sink);
            }
        }
    }

    /// `helmet({...})`.
    fn check_helmet(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let Some(options) = tree
            .call_args(ctx.node)
            .find(|a| tree.kind(*a) == NodeKind::ObjectLiteral)
        else {
            return;
        };
        for (key, header) in HELMET_OPTIONS {
            let Some(prop) = tree.property(options, key) else {
                continue;
            };
            let Some(value) = tree.property_value(prop) else {
                continue;
            };
            if bool_value(tree, value) == Some(false) {
                self.report_disabled(tree, prop, header, sink);
                continue;
            }
            match *header {
                CSP => self.check_csp_value(tree, value, sink),
                HSTS => {
                    let age = tree
                        .property(value, "maxAge")
                        .and_then(|p| tree.property_value(p))
                        .and_then(|v| number_value(tree, v));
                    if let Some(age) = age.filter(|a| *a < MIN_HSTS_MAX_AGE) {
                        self.report_weak(tree, prop, HSTS, &format!("max-age={age}"), sink);
                    }
                }
                XFO | REFERRER => {
                    let field = if *header == XFO { "action" } else { "policy" };
                    let text = tree
                        .property(value, field)
                        .and_then(|p| tree.property_value(p))
                        .and_then(|v| tree.string_value(v));
                    if let Some(text) = text.filter(|t| weak_value(header, t)) {
                        self.report_weak(tree, prop, header, text, sink);
                    }
                }
                _ => {}
            }
        }
    }

    /// `Talisman(app, ...)`.
    fn check_talisman(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        for (key, header) in TALISMAN_TOGGLES {
            let Some(prop) = call_option(tree, ctx.node, key) else {
                continue;
            };
            let Some(value) = tree.property_value(prop) else {
                continue;
            };
            let off = bool_value(tree, value) == Some(false)
                || tree.kind(value) == NodeKind::NullLiteral;
            if off {
                self.report_disabled(tree, prop, header, sink);
                continue;
            }
            match *header {
                CSP => {
                    let report = call_option(tree, ctx.node, "content_security_policy_report_uri")
                        .is_some();
                    let directives = if tree.kind(value) == NodeKind::ObjectLiteral {
                        directives_from_object(tree, value)
                    } else if let Some(text) = tree.string_value(value) {
                        directives_from_string(text, value)
                    } else {
                        continue;
                    };
                    self.check_csp(tree, value, &directives, report, sink);
                }
                XFO | REFERRER => {
                    if let Some(text) = tree.string_value(value).filter(|t| weak_value(header, t)) {
                        self.report_weak(tree, prop, header, text, sink);
                    }
                }
                _ => {}
            }
        }
        if let Some(prop) = call_option(tree, ctx.node, "strict_transport_security_max_age") {
            let age = tree.property_value(prop).and_then(|v| number_value(tree, v));
            if let Some(age) = age.filter(|a| *a < MIN_HSTS_MAX_AGE) {
                self.report_weak(tree, prop, HSTS, &format!("max-age={age}"), sink);
            }
        }
    }

    /// `res.setHeader("X-Frame-Options", "ALLOWALL")`.
    fn check_setter(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let mut args = tree.call_args(ctx.node);
        let (Some(name), Some(value)) = (args.next(), args.next()) else {
            return;
        };
        let Some(header) = tree.string_value(name).and_then(canonical_header) else {
            return;
        };
        self.check_header_value(tree, header, value, sink);
    }

    fn check_call(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let Some(path) = ctx.tree.callee_path(ctx.node) else {
            return;
        };
        if path_is(&path, "helmet") {
            self.check_helmet(ctx, sink);
        } else if path_is(&path, "Talisman") {
            self.check_talisman(ctx, sink);
        } else if path.contains('.') && HEADER_SETTERS.contains(&last_segment(&path)) {
            self.check_setter(ctx, sink);
        }
    }

    /// Plain header maps: `{ "X-Frame-Options": "DENY", ... }`.
    fn check_object(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let inside_helper = ctx.ancestors.iter().any(|a| {
            tree.kind(*a) == NodeKind::Call
                && tree
                    .callee_path(*a)
                    .is_some_and(|p| path_is(&p, "helmet") || path_is(&p, "Talisman"))
        });
        if inside_helper {
            return;
        }
        let mut present = Vec::new();
        for prop in tree.children(ctx.node).iter().copied() {
            if tree.kind(prop) != NodeKind::Property {
                continue;
            }
            let Some(header) = tree.text(prop).and_then(canonical_header) else {
                continue;
            };
            present.push(header);
            if let Some(value) = tree.property_value(prop) {
                self.check_header_value(tree, header, value, sink);
            }
        }
        if !present.iter().any(|h| SECURITY_HEADERS.contains(h)) {
            return;
        }
        for header in SECURITY_HEADERS {
            if !present.contains(header) {
                self.report_missing(tree, ctx.node, header, sink);
            }
        }
    }

    /// `response.headers["X-Frame-Options"] = "ALLOWALL"`.
    fn check_assignment(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let (Some(target), Some(value)) = (tree.binding_target(ctx.node), tree.binding_value(ctx.node))
        else {
            return;
        };
        if tree.kind(target) != NodeKind::Index {
            return;
        }
        let Some(header) = tree
            .child(target, 1)
            .and_then(|k| tree.string_value(k))
            .and_then(canonical_header)
        else {
            return;
        };
        self.check_header_value(tree, header, value, sink);
    }
}

impl Rule for RequireSecurityHeaders {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::Call, NodeKind::ObjectLiteral, NodeKind::Assignment]
    }

    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        match ctx.kind() {
            NodeKind::Call => self.check_call(ctx, sink),
            NodeKind::ObjectLiteral => self.check_object(ctx, sink),
            _ => self.check_assignment(ctx, sink),
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
    fn test_weak_values() {
        assert!(weak_value(HSTS, "max-age=3600"));
        assert!(!weak_value(HSTS, "max-age=31536000; includeSubDomains"));
        assert!(weak_value(XFO, "ALLOW-FROM https://a.example"));
        assert!(!weak_value(XFO, "DENY"));
        assert!(weak_value(ACAO, "*"));
        assert!(weak_value(REFERRER, "unsafe-url"));
        assert!(weak_value(PERMISSIONS, "camera=*"));
        assert!(weak_value(PERMISSIONS, "microphone=(), geolocation=(self *)"));
        assert!(!weak_value(PERMISSIONS, "camera=(), geolocation=(self \"https://maps.example\")"));
    }

    #[test]
    fn test_permissive_permissions_policy_header() {
        let mut b = TreeBuilder::new();
        let name = b.string("Permissions-Policy");
        let value = b.string("camera=*, microphone=()");
        let call = b.call_path("res.setHeader", vec![name, value]);
        let unit = b.unit("app.js", Language::JavaScript, vec![call]);

        let findings = run_rule(&RequireSecurityHeaders, &unit);
        assert_eq!(message_ids(&findings), vec!["weakHeaderValue"]);
        assert_eq!(findings[0].data[0].1, PERMISSIONS);
    }

    #[test]
    fn test_kebab_directives() {
        assert_eq!(kebab("scriptSrc"), "script-src");
        assert_eq!(kebab("default-src"), "default-src");
        assert_eq!(kebab("base_uri"), "base-uri");
    }

    #[test]
    fn test_header_object_missing_and_weak() {
        let mut b = TreeBuilder::new();
        let xfo = b.string("SAMEORIGIN");
        let xfo_prop = b.prop("X-Frame-Options", xfo);
        let hsts = b.string("max-age=600");
        let hsts_prop = b.prop("Strict-Transport-Security", hsts);
        let headers = b.object(vec![xfo_prop, hsts_prop]);
        let decl = b.declare("securityHeaders", headers);
        let unit = b.unit("server.js", Language::JavaScript, vec![decl]);

        let findings = run_rule(&RequireSecurityHeaders, &unit);
        assert_eq!(
            message_ids(&findings),
            vec!["weakHeaderValue", "missingHeader", "missingHeader", "missingHeader", "missingHeader"]
        );
        let missing: Vec<&str> = findings[1..].iter().map(|f| f.data[0].1.as_str()).collect();
        assert_eq!(missing, vec![CSP, XCTO, REFERRER, PERMISSIONS]);
    }

    #[test]
    fn test_csp_string() {
        let mut b = TreeBuilder::new();
        let name = b.string("Content-Security-Policy");
        let value = b.string("default-src 'self'; script-src 'self' 'unsafe-inline'");
        let call = b.call_path("res.setHeader", vec![name, value]);
        let unit = b.unit("app.js", Language::JavaScript, vec![call]);

        let findings = run_rule(&RequireSecurityHeaders, &unit);
        assert_eq!(
            message_ids(&findings),
            vec![
                "unsafeCspSource",
                "cspMissingNonce",
                "cspMissingDirective",
                "cspMissingDirective",
                "missingReportEndpoint"
            ]
        );
    }

    #[test]
    fn test_helmet_disabled_csp() {
        let mut b = TreeBuilder::new();
        let off = b.boolean(false);
        let csp = b.prop("contentSecurityPolicy", off);
        let opts = b.object(vec![csp]);
        let helmet = b.call_path("helmet", vec![opts]);
        let call = b.call_path("app.use", vec![helmet]);
        let unit = b.unit("app.js", Language::JavaScript, vec![call]);

        let findings = run_rule(&RequireSecurityHeaders, &unit);
        assert_eq!(message_ids(&findings), vec!["headerDisabled"]);
        assert_eq!(findings[0].data[0].1, CSP);
    }
}
