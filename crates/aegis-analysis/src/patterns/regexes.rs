//! Compiled regexes over literal text. Each is built lazily once; a pattern
//! that fails to compile disables its check instead of aborting the scan.

use std::sync::LazyLock;

use regex::Regex;

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| tracing::warn!(pattern, error = %e, "pattern failed to compile"))
        .ok()
}

static SQL_STATEMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        r"(?is)\b(select\s.+?\sfrom|insert\s+into|update\s+\S+\s+set|delete\s+from|drop\s+(table|database)|union\s+(all\s+)?select|where\s+\S+\s*(=|like|in)\s*)",
    )
});

static SHELL_METACHAR: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"[;&|`]|\$\(|\b(sh|bash|cmd|powershell)\b"));

static PATH_TRAVERSAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(\.\./|\.\.\\|^/|^[A-Za-z]:\\)"));

static NOSQL_OPERATOR: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"^\$(where|ne|gt|gte|lt|lte|in|nin|regex|expr|or|and|not|exists|function)$")
});

static KEY_SIZE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)^(rsa|dsa|dh|ec|ecdsa|aes)[-_]?(\d{2,5})"));

static DURATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(ms|s|sec|secs|seconds?|m|min|mins|minutes?|h|hrs?|hours?|d|days?|w|weeks?|y|yrs?|years?)?\s*$"));

fn is_match(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|r| r.is_match(text))
}

/// Text that contains an SQL statement fragment.
pub fn is_sql(text: &str) -> bool {
    is_match(&SQL_STATEMENT, text)
}

/// Text that contains shell control characters or names a shell.
pub fn has_shell_metachar(text: &str) -> bool {
    is_match(&SHELL_METACHAR, text)
}

/// Relative traversal or absolute path prefix.
pub fn has_path_traversal(text: &str) -> bool {
    is_match(&PATH_TRAVERSAL, text)
}

/// MongoDB-style query operator key (`$where`, `$ne`, ...).
pub fn is_nosql_operator(key: &str) -> bool {
    is_match(&NOSQL_OPERATOR, key)
}

/// Algorithm family and key size encoded in a name such as `aes-128-cbc`
/// or `rsa_1024`.
pub fn key_size_in_name(name: &str) -> Option<(String, u32)> {
    let caps = KEY_SIZE.as_ref()?.captures(name)?;
    let family = caps.get(1)?.as_str().to_ascii_lowercase();
    let bits = caps.get(2)?.as_str().parse().ok()?;
    Some((family, bits))
}

/// Parse a duration given as a number of seconds or a string such as
/// `"7d"`, `"2 hours"`, `"90m"`. Returns seconds.
pub fn parse_duration_secs(text: &str) -> Option<f64> {
    let caps = DURATION.as_ref()?.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
    let factor = match unit.as_deref() {
        None | Some("s" | "sec" | "secs" | "second" | "seconds") => 1.0,
        Some("ms") => 0.001,
        Some(u) if u.starts_with('m') => 60.0,
        Some(u) if u.starts_with('h') => 3_600.0,
        Some(u) if u.starts_with('d') => 86_400.0,
        Some(u) if u.starts_with('w') => 604_800.0,
        Some(u) if u.starts_with('y') => 31_557_600.0,
        Some(_) => return None,
    };
    Some(value * factor)
}
