//! `no-weak-crypto`: deny-listed primitives, short keys, and
//! non-cryptographic randomness in security contexts.

use aegis_core::types::Severity;

use super::common::{call_option, last_segment, number_value};
use super::context::VisitContext;
use super::finding::{Finding, FindingSink};
use super::traits::{Rule, RuleCategory, RuleMeta};
use crate::patterns::regexes::key_size_in_name;
use crate::patterns::normalize_name;
use crate::tree::{Language, NodeId, NodeKind};

pub static META: RuleMeta = RuleMeta {
    id: "no-weak-crypto",
    category: RuleCategory::Crypto,
    default_severity: Severity::Error,
    description: "Cryptography must use modern algorithms, adequate key sizes and a CSPRNG.",
    messages: &[
        ("weakAlgorithm", "Weak algorithm '{algo}'; use {recommended}."),
        (
            "weakKeySize",
            "{algo} key size {size} is below the minimum of {minimum} bits.",
        ),
        (
            "insecureRandom",
            "'{call}' is not cryptographically secure but generates '{context}'; use {recommended}.",
        ),
    ],
    whole_program: false,
};

/// Deny-listed primitive -> recommended replacement.
const WEAK_ALGORITHMS: &[(&str, &str)] = &[
    ("md5", "SHA-256"),
    ("md4", "SHA-256"),
    ("sha1", "SHA-256"),
    ("des", "AES-256-GCM"),
    ("3des", "AES-256-GCM"),
    ("des3", "AES-256-GCM"),
    ("desede", "AES-256-GCM"),
    ("desede3", "AES-256-GCM"),
    ("tripledes", "AES-256-GCM"),
    ("rc4", "AES-256-GCM"),
    ("arc4", "AES-256-GCM"),
    ("blowfish", "AES-256-GCM"),
    ("bf", "AES-256-GCM"),
];

/// Minimum key size in bits per algorithm family.
const KEY_MINIMUMS: &[(&str, u32)] = &[
    ("rsa", 2048),
    ("dsa", 2048),
    ("dh", 2048),
    ("ec", 256),
    ("ecdsa", 256),
    ("aes", 128),
];

const KEY_SIZE_OPTIONS: &[&str] = &["modulusLength", "key_size", "keySize", "bits", "length"];

/// Callee names that take an algorithm name as an argument.
const CRYPTO_CALL_MARKERS: &[&str] = &[
    "hash", "cipher", "crypt", "digest", "hmac", "sign", "verify", "getinstance", "hashlib",
    "pbkdf", "keypair", "generatekey",
];

const INSECURE_RANDOM: &[&str] = &[
    "Math.random",
    "random.random",
    "random.randint",
    "random.randrange",
    "random.choice",
    "random.choices",
    "random.getrandbits",
    "random.uniform",
    "random.sample",
];

pub struct NoWeakCrypto;

fn weak_algorithm(name: &str) -> Option<(&'static str, &'static str)> {
    let lowered = name.to_ascii_lowercase();
    let normalized = normalize_name(name);
    lowered
        .split(|c: char| matches!(c, '-' | '_' | '/' | ' ' | '.'))
        .chain(std::iter::once(normalized.as_str()))
        .find_map(|token| WEAK_ALGORITHMS.iter().find(|(w, _)| *w == token))
        .map(|(w, r)| (*w, *r))
}

fn key_minimum(family: &str) -> Option<u32> {
    KEY_MINIMUMS
        .iter()
        .find(|(f, _)| *f == family)
        .map(|(_, m)| *m)
}

fn is_crypto_call(path: &str) -> bool {
    let normalized = normalize_name(path);
    CRYPTO_CALL_MARKERS.iter().any(|m| normalized.contains(m))
}

impl NoWeakCrypto {
    /// Callee segment naming a weak primitive: `hashlib.md5`, `DES.new`,
    /// `CryptoJS.TripleDES.encrypt`.
    fn check_callee(&self, ctx: &VisitContext<'_>, path: &str, sink: &mut FindingSink) -> bool {
        for segment in path.split('.') {
            let normalized = normalize_name(segment);
            if let Some((algo, recommended)) =
                WEAK_ALGORITHMS.iter().find(|(w, _)| *w == normalized)
            {
                sink.report(
                    Finding::at(ctx.tree, ctx.node, "weakAlgorithm")
                        .with("algo", *algo)
                        .with("recommended", *recommended),
                );
                return true;
            }
        }
        false
    }

    /// Algorithm names passed as string arguments:
    /// `crypto.createHash('md5')`, `hashlib.new('sha1')`.
    fn check_algorithm_args(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let tree = ctx.tree;
        for arg in tree.call_args(ctx.node) {
            let Some(value) = tree.string_value(arg) else {
                continue;
            };
            if let Some((algo, recommended)) = weak_algorithm(value) {
                sink.report(
                    Finding::at(tree, ctx.node, "weakAlgorithm")
                        .with("algo", algo)
                        .with("recommended", recommended),
                );
                return;
            }
            if let Some((family, bits)) = key_size_in_name(value) {
                self.report_key_size(ctx, ctx.node, &family, bits, sink);
                return;
            }
        }
    }

    fn report_key_size(
        &self,
        ctx: &VisitContext<'_>,
        at: NodeId,
        family: &str,
        bits: u32,
        sink: &mut FindingSink,
    ) {
        if let Some(minimum) = key_minimum(family) {
            if bits < minimum {
                sink.report(
                    Finding::at(ctx.tree, at, "weakKeySize")
                        .with("algo", family.to_ascii_uppercase())
                        .with("size", bits.to_string())
                        .with("minimum", minimum.to_string()),
                );
            }
        }
    }

    /// Explicit key sizes: `generateKeyPairSync('rsa', { modulusLength: 1024 })`,
    /// `rsa.generate_private_key(key_size=1024)`, `RSA.generate(1024)`.
    fn check_key_size(&self, ctx: &VisitContext<'_>, path: &str, sink: &mut FindingSink) {
        let tree = ctx.tree;
        let family = tree
            .call_args(ctx.node)
            .find_map(|a| tree.string_value(a))
            .map(str::to_ascii_lowercase)
            .filter(|v| key_minimum(v).is_some())
            .or_else(|| {
                path.split('.')
                    .map(str::to_ascii_lowercase)
                    .find(|s| key_minimum(s).is_some())
            });
        let Some(family) = family else {
            return;
        };

        for key in KEY_SIZE_OPTIONS {
            if let Some(prop) = call_option(tree, ctx.node, key) {
                if let Some(bits) = tree.property_value(prop).and_then(|v| number_value(tree, v)) {
                    self.report_key_size(ctx, prop, &family, bits as u32, sink);
                }
                return;
            }
        }
        if last_segment(path).eq_ignore_ascii_case("generate") {
            if let Some(bits) = tree
                .call_args(ctx.node)
                .next()
                .and_then(|a| number_value(tree, a))
            {
                self.report_key_size(ctx, ctx.node, &family, bits as u32, sink);
            }
        }
    }

    fn check_random(&self, ctx: &VisitContext<'_>, path: &str, sink: &mut FindingSink) {
        if !INSECURE_RANDOM.contains(&path) {
            return;
        }
        let Some(context) = ctx.enclosing_binding_name() else {
            return;
        };
        if !ctx.patterns.crypto_context.matches(context) {
            return;
        }
        let recommended = match ctx.language() {
            Language::Python => "the secrets module",
            Language::JavaScript | Language::TypeScript => "crypto.randomBytes or crypto.getRandomValues",
        };
        sink.report(
            Finding::at(ctx.tree, ctx.node, "insecureRandom")
                .with("call", path)
                .with("context", context)
                .with("recommended", recommended),
        );
    }
}

impl Rule for NoWeakCrypto {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::Call, NodeKind::New]
    }

    fn visit(&self, ctx: &VisitContext<'_>, sink: &mut FindingSink) {
        let Some(path) = ctx.tree.callee_path(ctx.node) else {
            return;
        };
        self.check_random(ctx, &path, sink);
        if self.check_callee(ctx, &path, sink) {
            return;
        }
        if is_crypto_call(&path) {
            self.check_algorithm_args(ctx, sink);
        }
        self.check_key_size(ctx, &path, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_algorithm_names() {
        assert_eq!(weak_algorithm("md5").map(|w| w.0), Some("md5"));
        assert_eq!(weak_algorithm("des-ede3-cbc").map(|w| w.0), Some("des"));
        assert_eq!(weak_algorithm("RSA-SHA1").map(|w| w.0), Some("sha1"));
        assert_eq!(weak_algorithm("aes-256-gcm"), None);
        assert_eq!(weak_algorithm("sha256"), None);
    }
}
