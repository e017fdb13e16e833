//! Parser errors.

use std::path::PathBuf;

use super::error_code::{self, AegisErrorCode};

/// Errors raised by the parser collaborator for a single file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Grammar setup failed for {language}: {message}")]
    GrammarSetup { language: String, message: String },

    #[error("Tree-sitter produced no tree for {path}")]
    NoTree { path: PathBuf },

    #[error("Source of {path} is not valid UTF-8")]
    InvalidUtf8 { path: PathBuf },

    #[error("Malformed tree for {path}: {message}")]
    InvalidTree { path: PathBuf, message: String },
}

impl AegisErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTree { .. } => error_code::INVALID_TREE,
            _ => error_code::PARSE_ERROR,
        }
    }
}
