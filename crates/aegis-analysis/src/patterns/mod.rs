//! Pattern library: keyword sets, entropy scoring, regexes, and request/route
//! helpers shared by several rules.
//!
//! Everything here is built once into a `PatternContext` and shared read-only
//! by every worker.

pub mod context;
pub mod entropy;
pub mod keywords;
pub mod regexes;
pub mod request;

pub use context::PatternContext;
pub use entropy::{looks_encoded, shannon_entropy};
pub use keywords::{normalize_name, KeywordSet};
