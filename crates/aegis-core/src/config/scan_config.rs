//! Scan/worker configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FILE_TIMEOUT_MS, DEFAULT_MAX_FILE_SIZE, DEFAULT_THREADS};

/// Configuration for file discovery and the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    /// Worker threads. 0 = one per available core.
    pub threads: Option<usize>,
    /// Maximum file size in bytes. Larger files are skipped with a diagnostic.
    pub max_file_size: Option<u64>,
    /// Per-file soft deadline for traversal, in milliseconds.
    pub file_timeout_ms: Option<u64>,
}

impl ScanConfig {
    /// Returns the effective thread count, defaulting to 0 (auto).
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or(DEFAULT_THREADS)
    }

    /// Returns the effective max file size, defaulting to 1MB.
    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE)
    }

    /// Returns the effective per-file deadline, defaulting to 10s.
    pub fn effective_file_timeout_ms(&self) -> u64 {
        self.file_timeout_ms.unwrap_or(DEFAULT_FILE_TIMEOUT_MS)
    }
}
