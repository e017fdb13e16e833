//! Pipeline errors.

use super::error_code::{self, AegisErrorCode};
use super::{ConfigError, ParseError, ScanError};

/// Errors that can occur during pipeline execution.
/// Aggregates subsystem errors via `From` conversions.
///
/// Only `Config` ever aborts a scan; the other variants are contained to a
/// file and turned into diagnostics by the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl PipelineError {
    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::WorkerPool(_))
    }
}

impl AegisErrorCode for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Scan(e) => e.error_code(),
            Self::Parse(e) => e.error_code(),
            Self::WorkerPool(_) => error_code::SCAN_ERROR,
        }
    }
}
