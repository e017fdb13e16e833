//! Source tree arena.
//!
//! A parsed file is a flat `Vec<Node>` addressed by `NodeId`. Nodes own their
//! child ids; there are no parent pointers. Parents are recovered from the
//! ancestor stack the dispatcher maintains during traversal.

pub mod arena;
pub mod builder;
pub mod node;

pub use arena::{Descendants, SourceTree, SourceUnit};
pub use builder::TreeBuilder;
pub use node::{Language, Node, NodeId, NodeKind, Span};
