//! Shared constants for the Aegis analyzer.

/// Aegis version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project config file looked up at the scan root.
pub const PROJECT_CONFIG_FILE: &str = "aegis.toml";

/// Maximum file size in bytes for scanning (default: 1MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Default number of worker threads (0 = one per available core).
pub const DEFAULT_THREADS: usize = 0;

/// Default per-file soft deadline for tree traversal.
pub const DEFAULT_FILE_TIMEOUT_MS: u64 = 10_000;

/// Node visits between two cancellation/deadline checks.
pub const DEADLINE_CHECK_INTERVAL: usize = 256;

/// Default tracing directive when `AEGIS_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVE: &str = "aegis=warn";

/// Rule id used for diagnostics about files that could not be parsed.
pub const PARSE_ERROR_RULE_ID: &str = "internal/parse-error";

/// Rule id used for diagnostics about files that could not be read.
pub const IO_ERROR_RULE_ID: &str = "internal/io-error";

/// Rule id used for diagnostics about files that exceeded the deadline.
pub const TIMEOUT_RULE_ID: &str = "internal/timeout";

/// Category name attached to pipeline-generated diagnostics.
pub const INTERNAL_CATEGORY: &str = "internal";

/// Inline suppression marker.
pub const SUPPRESSION_MARKER: &str = "aegis-ignore";
