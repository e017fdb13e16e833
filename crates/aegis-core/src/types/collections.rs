//! Re-exports of performance-oriented collection types.

pub use rustc_hash::{FxHashMap, FxHashSet};
pub use smallvec::SmallVec;
pub use std::collections::BTreeMap;

/// SmallVec sized for node children (most nodes have <4).
pub type SmallVec4<T> = SmallVec<[T; 4]>;

/// SmallVec sized for per-kind visitor lists.
pub type SmallVec8<T> = SmallVec<[T; 8]>;

/// SmallVec sized for finding template data (usually 1-2 entries).
pub type SmallVec2<T> = SmallVec<[T; 2]>;
