//! # aegis-analysis
//!
//! Analysis engine for the Aegis security analyzer.
//! Provides the source tree arena, tree-sitter parsers, the pattern library,
//! the built-in security rules, the dispatcher and aggregator, the parallel
//! scan pipeline, file discovery and reporters.

pub mod engine;
pub mod parsers;
pub mod patterns;
pub mod pipeline;
pub mod reporters;
pub mod rules;
pub mod scanner;
pub mod tree;

pub use engine::{Diagnostic, ResolvedConfig, ScanResult};
pub use pipeline::{FsProvider, MemoryProvider, ScanPipeline, SourceProvider};
pub use reporters::{create_reporter, Reporter};
pub use rules::{Rule, RuleRegistry};
pub use tree::{Language, SourceUnit};
