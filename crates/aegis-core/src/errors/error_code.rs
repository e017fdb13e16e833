//! AegisErrorCode trait: stable machine-readable codes for every error enum.

/// Every error enum implements this to expose a structured code string
/// that reporters and the CLI can surface alongside the message.
pub trait AegisErrorCode {
    /// Returns the error code string (e.g., "CONFIG_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const UNKNOWN_RULE: &str = "UNKNOWN_RULE";
pub const PARSE_ERROR: &str = "PARSE_ERROR";
pub const INVALID_TREE: &str = "INVALID_TREE";
pub const SCAN_ERROR: &str = "SCAN_ERROR";
pub const TIMEOUT: &str = "TIMEOUT";
pub const RULE_EXECUTION_ERROR: &str = "RULE_EXECUTION_ERROR";
