//! Rule execution errors.

use super::error_code::{self, AegisErrorCode};

/// Failures contained to a single rule or a single file.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Rule {rule_id} panicked: {message}")]
    Panicked { rule_id: String, message: String },

    #[error("Traversal exceeded the {timeout_ms}ms per-file deadline")]
    Timeout { timeout_ms: u64 },
}

impl AegisErrorCode for RuleError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Panicked { .. } => error_code::RULE_EXECUTION_ERROR,
            Self::Timeout { .. } => error_code::TIMEOUT,
        }
    }
}
