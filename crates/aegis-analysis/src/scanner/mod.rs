//! Scanner: file discovery with ignore handling.

pub mod ignores;
pub mod walker;

pub use ignores::IgnorePatterns;
pub use walker::{detect_language, to_unit_path, Scanner, SourceFile, WalkStats};
