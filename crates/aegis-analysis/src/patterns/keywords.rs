//! Case-insensitive keyword matching over normalized names.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

/// Lowercase and strip `_`, `-`, `.` and `$` so that `apiKey`, `api_key` and
/// `API-KEY` compare equal.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | '.' | '$'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// A set of substrings matched against normalized names.
#[derive(Debug)]
pub struct KeywordSet {
    keywords: &'static [&'static str],
    automaton: Option<AhoCorasick>,
}

impl KeywordSet {
    /// Keywords must already be normalized (lowercase, no separators).
    pub fn new(keywords: &'static [&'static str]) -> Self {
        let automaton = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(keywords)
            .map_err(|e| tracing::warn!(error = %e, "keyword automaton build failed"))
            .ok();
        Self {
            keywords,
            automaton,
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        self.keywords
    }

    /// Whether the normalized form of `name` contains any keyword.
    pub fn matches(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// First keyword found in the normalized form of `name`.
    pub fn find(&self, name: &str) -> Option<&'static str> {
        let automaton = self.automaton.as_ref()?;
        let normalized = normalize_name(name);
        automaton
            .find(&normalized)
            .map(|m| self.keywords[m.pattern().as_usize()])
    }

    /// Whether the normalized form of `name` equals a keyword.
    pub fn matches_exactly(&self, name: &str) -> bool {
        let normalized = normalize_name(name);
        self.keywords.iter().any(|k| *k == normalized)
    }
}

// Names that mark a binding as holding a credential.
pub const SECRET_NAMES: &[&str] = &[
    "password",
    "passwd",
    "passphrase",
    "secret",
    "token",
    "apikey",
    "accesskey",
    "privatekey",
    "clientsecret",
    "credential",
    "authkey",
    "signingkey",
    "encryptionkey",
    "ssn",
    "creditcard",
    "cardnumber",
    "connectionstring",
];

// Suffixes that turn a sensitive-looking name into metadata about the value.
pub const SECRET_NAME_FP_SUFFIXES: &[&str] = &[
    "type",
    "name",
    "field",
    "label",
    "url",
    "uri",
    "path",
    "header",
    "length",
    "len",
    "count",
    "expiry",
    "expiresin",
    "pattern",
    "regex",
    "placeholder",
    "prompt",
    "message",
    "error",
    "policy",
    "endpoint",
    "route",
    "storagekey",
    "cookiename",
];

// Values that identify people or grant access.
pub const SENSITIVE_DATA: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "apikey",
    "privatekey",
    "credential",
    "ssn",
    "socialsecurity",
    "creditcard",
    "cardnumber",
    "cvv",
    "dateofbirth",
    "birthdate",
    "passport",
    "bankaccount",
    "iban",
    "sessionid",
];

pub const CRYPTO_CONTEXT: &[&str] = &[
    "token", "secret", "key", "salt", "nonce", "password", "otp", "iv", "csrf", "session",
    "auth", "crypt", "hash", "uuid", "reset", "verification",
];

pub const SENSITIVE_OPERATIONS: &[&str] = &[
    "user",
    "admin",
    "account",
    "password",
    "payment",
    "settings",
    "profile",
    "billing",
    "role",
    "permission",
    "delete",
    "transfer",
    "withdraw",
    "invoice",
    "credential",
];

pub const HANDLER_MARKERS: &[&str] = &["handler", "controller"];

pub const AUTH_CHECKS: &[&str] = &[
    "requireauth",
    "authenticate",
    "isauthenticated",
    "ensureauthenticated",
    "ensureauth",
    "checkauth",
    "verifyauth",
    "verifytoken",
    "verifyjwt",
    "validatetoken",
    "authorize",
    "requirelogin",
    "loginrequired",
    "requireuser",
    "requirerole",
    "requirepermission",
    "haspermission",
    "checkpermission",
    "getserversession",
    "getcurrentuser",
    "currentuser",
    "authguard",
    "jwtrequired",
    "permissionrequired",
];

pub const RATE_LIMIT: &[&str] = &[
    "ratelimit",
    "ratelimiter",
    "limiter",
    "throttle",
    "slowdown",
    "bottleneck",
];

pub const VALIDATION_CALLS: &[&str] = &[
    "validate",
    "validator",
    "sanitize",
    "sanitise",
    "escape",
    "schema",
    "safeparse",
    "parseasync",
    "joi",
    "yup",
    "zod",
    "checkschema",
    "cleaned",
    "isvalid",
    "parameterize",
    "quote",
    "normalize",
];

pub const MASKING_CALLS: &[&str] = &[
    "mask",
    "redact",
    "hash",
    "encrypt",
    "omit",
    "sanitize",
    "anonymize",
    "truncate",
    "scrub",
    "obfuscate",
    "pseudonymize",
];

pub const LOG_CALLS: &[&str] = &["log", "info", "debug", "warn", "warning", "trace", "print"];

pub const STORAGE_CALLS: &[&str] = &[
    "localstorage",
    "sessionstorage",
    "setitem",
    "setcookie",
    "cookie",
    "writefile",
    "appendfile",
    "cache",
    "asyncstorage",
];

pub const APPROVED_STORAGE: &[&str] = &[
    "securestore",
    "keychain",
    "keyring",
    "vault",
    "secretsmanager",
    "encryptedstorage",
    "kms",
];
