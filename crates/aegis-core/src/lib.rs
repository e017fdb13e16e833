//! aegis-core: foundation crate for the Aegis security analyzer.
//!
//! Errors, configuration, shared value types, cancellation, tracing setup
//! and constants. Everything the analysis crate and the CLI share lives here.

pub mod config;
pub mod constants;
pub mod errors;
pub mod tracing;
pub mod traits;
pub mod types;

pub use config::{AegisConfig, CliOverrides, RuleSetting, ScanConfig};
pub use errors::{AegisErrorCode, ConfigError, ParseError, PipelineError, RuleError, ScanError};
pub use traits::{Cancellable, CancellationToken};
pub use types::{FailOn, Severity};
