//! `secure-token-handling`: JWT signing and verification options.

use aegis_core::types::Severity;

use super::common::{bool_value, call_option, number_value, options_object, path_is};
use super::context::VisitContext;
use super::finding::{Finding, FindingSink};
use super::traits::{Rule, RuleCategory, RuleMeta};
use crate::patterns::regexes::parse_duration_secs;
use crate::tree::{Language, NodeId, NodeKind, SourceTree};

pub static META: RuleMeta = RuleMeta {
    id: "secure-token-handling",
    category: RuleCategory::TokenHandling,
    default_severity: Severity::Error,
    description: "Tokens must be signed with an explicit strong algorithm, expire, and be verified against an algorithm allow-list.",
    messages: &[
        ("noAlgorithm", "Token is signed without an explicit algorithm."),
        ("weakTokenAlgorithm", "Token algorithm '{algo}' is insecure."),
        ("noExpiration", "Token is signed without an expiration."),
        (
            "longExpiration",
            "Token expiration of {seconds}s exceeds the {limit}s maximum.",
        ),
        (
            "noAlgorithmAllowList",
            "Token is verified without an explicit algorithm allow-list.",
        ),
        ("verificationDisabled", "Token verification is weakened by '{option}'."),
        ("sensitiveClaim", "Token payload carries sensitive claim '{claim}'."),
    ],
    whole_program: false,
};

/// Longest accepted token lifetime.
pub const MAX_EXPIRATION_SECS: f64 = 86_400.0;

const SIGN_CALLS: &[&str] = &["jwt.sign", "jsonwebtoken.sign", "jwt.encode", "jose.jwt.encode"];
const VERIFY_CALLS: &[&str] = &["jwt.verify", "jsonwebtoken.verify", "jose.jwt.decode"];

const WEAK_TOKEN_ALGORITHMS: &[&str] = &["none", ""];

const TIMEDELTA_UNITS: &[(&str, f64)] = &[
    ("weeks", 604_800.0),
    ("days", 86_400.0),
    ("hours", 3_600.0),
    ("minutes", 60.0),
    ("seconds", 1.0),
    ("milliseconds", 0.001),
];

pub struct SecureTokenHandling;

fn matches_any(path: &str, table: &[&str]) -> bool {
    table.iter().any(|t| path_is(path, t))
}

fn is_weak_algorithm(algo: &str) -> bool {
    WEAK_TOKEN_ALGORITHMS
        .iter()
        .any(|w| algo.trim().eq_ignore_ascii_case(w))
}

/// Seconds of a JS `expiresIn` value. Numbers are seconds; strings without
/// a unit are milliseconds, as `jsonwebtoken` reads them.
fn expires_in_secs(tree: &SourceTree, value: NodeId) -> Option<f64> {
    if let Some(n) = number_value(tree, value) {
        return Some(n);
    }
    let text = tree.string_value(value)?.trim();
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return text.parse::<f64>().ok().map(|ms| ms / 1000.0);
    }
    parse_duration_secs(text)
}

/// Seconds added by a `timedelta(days=30)` call anywhere in an `exp` value.
fn timedelta_secs(tree: &SourceTree, value: NodeId) -> Option<f64> {
    let call = tree.descendants(value).find(|d| {
        tree.kind(*d) == NodeKind::Call
            && tree
                .callee_path(*d)
                .is_some_and(|p| path_is(&p, "timedelta"))
    })?;
    let mut total = 0.0;
    for (i, arg) in tree.call_args(call).enumerate() {
        match tree.kind(arg) {
            NodeKind::Property => {
                let factor = tree.text(arg).and_then(|k| {
                    TIMEDELTA_UNITS.iter().find(|(u, _)| *u == k).map(|(_, f)| *f)
                });
                let amount = tree.property_value(arg).and_then(|v| number_value(tree, v));
                if let (Some(f), Some(n)) = (factor, amount) {
                    total += f * n;
                }
            }
            // Positional `timedelta(days)`.
            _ if i == 0 => total += number_value(tree, arg)? * 86_400.0,
            _ => {}
        }
    }
    Some(total)
}

impl SecureTokenHandling {
    fn check_sign(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let call = ctx.node;
        let payload = tree.call_args(call).next();
        let options = options_object(tree, call);

        match call_option(tree, call, "algorithm") {
            None => {
                sink.report(
                    Finding::at(tree, options.unwrap_or(call), "noAlgorithm")
                        .fix("Pass an explicit algorithm such as RS256 or ES256."),
                );
            }
            Some(prop) => {
                if let Some(algo) = tree.property_value(prop).and_then(|v| tree.string_value(v)) {
                    if is_weak_algorithm(algo) {
                        sink.report(
                            Finding::at(tree, prop, "weakTokenAlgorithm").with("algo", algo),
                        );
                    }
                }
            }
        }

        let payload_object = payload.filter(|p| tree.kind(*p) == NodeKind::ObjectLiteral);
        let exp = payload_object.and_then(|p| tree.property(p, "exp"));
        let expires_in = call_option(tree, call, "expiresIn");

        match (expires_in, exp) {
            (Some(prop), _) => {
                let secs = tree
                    .property_value(prop)
                    .and_then(|v| expires_in_secs(tree, v));
                self.check_lifetime(tree, prop, secs, sink);
            }
            (None, Some(prop)) => {
                let secs = tree
                    .property_value(prop)
                    .and_then(|v| timedelta_secs(tree, v));
                self.check_lifetime(tree, prop, secs, sink);
            }
            (None, None) => {
                // A payload built elsewhere may carry `exp`; Python has no
                // separate expiry option, so only literal payloads are judged.
                if payload_object.is_some() || ctx.language().is_js_family() {
                    sink.report(
                        Finding::at(tree, call, "noExpiration")
                            .fix("Set expiresIn (or an exp claim) of at most 24h."),
                    );
                }
            }
        }

        if let Some(payload) = payload_object {
            for prop in tree.children(payload).iter().copied() {
                if tree.kind(prop) != NodeKind::Property {
                    continue;
                }
                if let Some(claim) = tree.text(prop).filter(|k| ctx.patterns.sensitive_data.matches(k)) {
                    sink.report(
                        Finding::at(tree, prop, "sensitiveClaim")
                            .with("claim", claim)
                            .fix("Keep sensitive data out of token payloads; they are only encoded."),
                    );
                }
            }
        }
    }

    fn check_lifetime(
        &self,
        tree: &SourceTree,
        prop: NodeId,
        secs: Option<f64>,
        sink: &mut FindingSink,
    ) {
        if let Some(secs) = secs.filter(|s| *s > MAX_EXPIRATION_SECS) {
            sink.report(
                Finding::at(tree, prop, "longExpiration")
                    .with("seconds", format!("{}", secs.round() as i64))
                    .with("limit", format!("{}", MAX_EXPIRATION_SECS as i64))
                    .fix("Use short-lived access tokens with refresh tokens."),
            );
        }
    }

    fn check_verify(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let call = ctx.node;

        match call_option(tree, call, "algorithms") {
            None => {
                sink.report(
                    Finding::at(tree, call, "noAlgorithmAllowList")
                        .fix("Pass algorithms: [\"RS256\"] (or the algorithm you sign with)."),
                );
            }
            Some(prop) => {
                if let Some(list) = tree.property_value(prop) {
                    for item in tree.children(list).iter().copied() {
                        if let Some(algo) = tree.string_value(item).filter(|a| is_weak_algorithm(a)) {
                            sink.report(
                                Finding::at(tree, item, "weakTokenAlgorithm").with("algo", algo),
                            );
                        }
                    }
                }
            }
        }

        let mut disabled = |prop: NodeId, option: &str| {
            sink.report(
                Finding::at(tree, prop, "verificationDisabled")
                    .with("option", option.to_string())
                    .fix("Remove the option; always verify signature and expiry."),
            );
        };
        if let Some(prop) = call_option(tree, call, "ignoreExpiration") {
            if tree.property_value(prop).and_then(|v| bool_value(tree, v)) == Some(true) {
                disabled(prop, "ignoreExpiration");
            }
        }
        if let Some(prop) = call_option(tree, call, "verify") {
            if tree.property_value(prop).and_then(|v| bool_value(tree, v)) == Some(false) {
                disabled(prop, "verify");
            }
        }
        if let Some(options) = call_option(tree, call, "options").and_then(|p| tree.property_value(p)) {
            for key in ["verify_signature", "verify_exp"] {
                if let Some(prop) = tree.property(options, key) {
                    if tree.property_value(prop).and_then(|v| bool_value(tree, v)) == Some(false) {
                        disabled(prop, key);
                    }
                }
            }
        }
    }
}

impl Rule for SecureTokenHandling {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::Call]
    }

    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let Some(path) = ctx.tree.callee_path(ctx.node) else {
            return;
        };
        if matches_any(&path, SIGN_CALLS) {
            self.check_sign(ctx, sink);
        } else if matches_any(&path, VERIFY_CALLS)
            || (path_is(&path, "jwt.decode") && ctx.language() == Language::Python)
        {
            self.check_verify(ctx, sink);
        } else if path_is(&path, "jwt.decode") {
            // jsonwebtoken's decode never checks the signature.
            sink.report(
                Finding::at(ctx.tree, ctx.node, "verificationDisabled")
                    .with("option", "jwt.decode")
                    .fix("Use jwt.verify with an algorithm allow-list."),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::run_rule;
    use crate::tree::TreeBuilder;

    fn ids(findings: &[Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.message_id).collect()
    }

    #[test]
    fn test_sign_without_algorithm_and_long_expiry() {
        let mut b = TreeBuilder::new();
        let user = b.ident("userId");
        let payload_prop = b.prop("sub", user);
        let payload = b.object(vec![payload_prop]);
        let secret = b.ident("SECRET");
        let exp = b.number("999999");
        let exp_prop = b.prop("expiresIn", exp);
        let options = b.object(vec![exp_prop]);
        let call = b.call_path("jwt.sign", vec![payload, secret, options]);
        let unit = b.unit("auth.js", Language::JavaScript, vec![call]);

        let findings = run_rule(&SecureTokenHandling, &unit);
        assert_eq!(ids(&findings), vec!["noAlgorithm", "longExpiration"]);
        assert_eq!(findings[1].data[0].1, "999999");
    }

    #[test]
    fn test_expires_in_string_units() {
        let mut b = TreeBuilder::new();
        let short = b.string("15m");
        let long = b.string("7d");
        let ms = b.string("60000");
        let tree = b.finish(vec![short, long, ms]);
        assert_eq!(expires_in_secs(&tree, short), Some(900.0));
        assert_eq!(expires_in_secs(&tree, long), Some(604_800.0));
        assert_eq!(expires_in_secs(&tree, ms), Some(60.0));
    }

    #[test]
    fn test_python_verify_without_allow_list() {
        let mut b = TreeBuilder::new();
        let token = b.ident("token");
        let key = b.ident("key");
        let falsy = b.boolean(false);
        let verify_sig = b.prop("verify_signature", falsy);
        let opts = b.object(vec![verify_sig]);
        let opts_kw = b.prop("options", opts);
        let call = b.call_path("jwt.decode", vec![token, key, opts_kw]);
        let unit = b.unit("auth.py", Language::Python, vec![call]);

        let findings = run_rule(&SecureTokenHandling, &unit);
        assert_eq!(ids(&findings), vec!["noAlgorithmAllowList", "verificationDisabled"]);
    }

    #[test]
    fn test_well_configured_sign_is_clean() {
        let mut b = TreeBuilder::new();
        let sub = b.ident("id");
        let sub_prop = b.prop("sub", sub);
        let payload = b.object(vec![sub_prop]);
        let key = b.ident("privateKey");
        let algo = b.string("RS256");
        let algo_prop = b.prop("algorithm", algo);
        let exp = b.string("15m");
        let exp_prop = b.prop("expiresIn", exp);
        let options = b.object(vec![algo_prop, exp_prop]);
        let call = b.call_path("jwt.sign", vec![payload, key, options]);
        let unit = b.unit("auth.ts", Language::TypeScript, vec![call]);

        assert!(run_rule(&SecureTokenHandling, &unit).is_empty());
    }

    #[test]
    fn test_sensitive_claim() {
        let mut b = TreeBuilder::new();
        let pw = b.ident("password");
        let pw_prop = b.prop("password", pw);
        let payload = b.object(vec![pw_prop]);
        let key = b.ident("key");
        let algo = b.string("HS256");
        let algo_kw = b.prop("algorithm", algo);
        let call = b.call_path("jwt.encode", vec![payload, key, algo_kw]);
        let unit = b.unit("tokens.py", Language::Python, vec![call]);

        let findings = run_rule(&SecureTokenHandling, &unit);
        assert_eq!(ids(&findings), vec!["noExpiration", "sensitiveClaim"]);
    }
}
