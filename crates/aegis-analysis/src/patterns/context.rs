//! Shared, immutable matcher context handed to every rule visitor.

use super::keywords::{self, KeywordSet};

/// All keyword sets, built once per process.
#[derive(Debug)]
pub struct PatternContext {
    pub secret_names: KeywordSet,
    pub secret_name_fp_suffixes: &'static [&'static str],
    pub sensitive_data: KeywordSet,
    pub crypto_context: KeywordSet,
    pub sensitive_operations: KeywordSet,
    pub handler_markers: KeywordSet,
    pub auth_checks: KeywordSet,
    pub rate_limit: KeywordSet,
    pub validation_calls: KeywordSet,
    pub masking_calls: KeywordSet,
    pub log_calls: KeywordSet,
    pub storage_calls: KeywordSet,
    pub approved_storage: KeywordSet,
}

impl PatternContext {
    pub fn new() -> Self {
        Self {
            secret_names: KeywordSet::new(keywords::SECRET_NAMES),
            secret_name_fp_suffixes: keywords::SECRET_NAME_FP_SUFFIXES,
            sensitive_data: KeywordSet::new(keywords::SENSITIVE_DATA),
            crypto_context: KeywordSet::new(keywords::CRYPTO_CONTEXT),
            sensitive_operations: KeywordSet::new(keywords::SENSITIVE_OPERATIONS),
            handler_markers: KeywordSet::new(keywords::HANDLER_MARKERS),
            auth_checks: KeywordSet::new(keywords::AUTH_CHECKS),
            rate_limit: KeywordSet::new(keywords::RATE_LIMIT),
            validation_calls: KeywordSet::new(keywords::VALIDATION_CALLS),
            masking_calls: KeywordSet::new(keywords::MASKING_CALLS),
            log_calls: KeywordSet::new(keywords::LOG_CALLS),
            storage_calls: KeywordSet::new(keywords::STORAGE_CALLS),
            approved_storage: KeywordSet::new(keywords::APPROVED_STORAGE),
        }
    }

    /// Name that holds a credential: contains a secret keyword and does not
    /// end in a metadata suffix (`passwordField`, `tokenUrl`).
    pub fn is_secret_name(&self, name: &str) -> bool {
        if name.chars().count() < 4 || !self.secret_names.matches(name) {
            return false;
        }
        let normalized = keywords::normalize_name(name);
        !self
            .secret_name_fp_suffixes
            .iter()
            .any(|suffix| normalized.ends_with(suffix))
    }

    /// Field or variable that holds sensitive personal or access data
    /// (`user.password`, `ssn`), excluding metadata names (`tokenExpiry`).
    pub fn is_sensitive_field(&self, name: &str) -> bool {
        if !self.sensitive_data.matches(name) {
            return false;
        }
        let normalized = keywords::normalize_name(name);
        !self
            .secret_name_fp_suffixes
            .iter()
            .any(|suffix| normalized.ends_with(suffix))
    }
}

impl Default for PatternContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_names() {
        let ctx = PatternContext::new();
        assert!(ctx.is_secret_name("DB_PASSWORD"));
        assert!(ctx.is_secret_name("apiKey"));
        assert!(!ctx.is_secret_name("passwordField"));
        assert!(!ctx.is_secret_name("tokenUrl"));
        assert!(!ctx.is_secret_name("pwd"));
        assert!(!ctx.is_secret_name("username"));
    }

    #[test]
    fn test_sensitive_fields() {
        let ctx = PatternContext::new();
        assert!(ctx.is_sensitive_field("password"));
        assert!(ctx.is_sensitive_field("creditCardNumber"));
        assert!(!ctx.is_sensitive_field("tokenExpiry"));
        assert!(!ctx.is_sensitive_field("email"));
    }
}
