//! Rule system: 10 security rules, one per category.
//!
//! Each rule implements the `Rule` trait and is registered in the
//! `RuleRegistry`. Rules are pure: they read the tree and report findings
//! into a sink; whole-program rules additionally record facts.

pub mod common;
pub mod context;
pub mod finding;
pub mod registry;
pub mod traits;

pub mod auth;
pub mod crypto;
pub mod data_leak;
pub mod deserialization;
pub mod headers;
pub mod input_validation;
pub mod rate_limit;
pub mod secrets;
pub mod token;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{ReduceContext, VisitContext};
pub use finding::{Fact, Finding, FindingSink};
pub use registry::RuleRegistry;
pub use traits::{Rule, RuleCategory, RuleMeta};

/// Every built-in rule, in category order.
pub fn builtin_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(secrets::NoHardcodedSecrets),
        Box::new(transport::NoInsecureTransport),
        Box::new(crypto::NoWeakCrypto),
        Box::new(deserialization::NoUnsafeDeserialization),
        Box::new(auth::RequireAuthCheck::new()),
        Box::new(token::SecureTokenHandling),
        Box::new(rate_limit::RequireRateLimit),
        Box::new(headers::RequireSecurityHeaders),
        Box::new(input_validation::RequireInputValidation),
        Box::new(data_leak::NoSensitiveDataLeak),
    ]
}
