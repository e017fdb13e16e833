//! Analysis engine: per-file dispatch, suppression, configuration
//! resolution and aggregation into a `ScanResult`.

pub mod aggregator;
pub mod dispatcher;
pub mod file_index;
pub mod resolver;
pub mod suppression;
pub mod types;

pub use aggregator::{sort_diagnostics, DiagnosticAggregator};
pub(crate) use dispatcher::panic_message;
pub use dispatcher::{Dispatcher, FileOutcome, FileStatus};
pub use file_index::FileIndex;
pub use resolver::{ResolvedConfig, ResolvedRule};
pub use suppression::{SuppressionChecker, SuppressionDirective};
pub use types::{render_template, Diagnostic, ScanResult, SeverityCounts};
