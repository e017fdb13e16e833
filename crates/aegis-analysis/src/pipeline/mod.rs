//! Scan pipeline: validation, parallel per-file dispatch, whole-program
//! reduction and result assembly.

pub mod provider;
pub mod runner;
pub mod state;

pub use provider::{FsProvider, MemoryProvider, MemorySource, SourceEntry, SourceProvider};
pub use runner::{load_failure, ScanPipeline};
pub use state::PipelineState;
