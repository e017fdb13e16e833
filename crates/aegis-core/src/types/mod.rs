//! Shared value types for Aegis.

pub mod collections;
pub mod severity;

pub use collections::{FxHashMap, FxHashSet};
pub use severity::{FailOn, Severity};
