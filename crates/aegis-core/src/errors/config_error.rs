//! Configuration errors.

use super::error_code::{self, AegisErrorCode};

/// Errors that can occur during configuration loading and validation.
/// All of them are fatal: the scan never starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Config parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Unknown rule id in config: {rule_id}")]
    UnknownRule { rule_id: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Invalid config value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl AegisErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownRule { .. } => error_code::UNKNOWN_RULE,
            _ => error_code::CONFIG_ERROR,
        }
    }
}
