//! Immutable rule registry, indexed by id and by node kind.

use aegis_core::types::collections::{FxHashMap, SmallVec8};

use super::traits::Rule;
use crate::tree::NodeKind;

/// All rules of a scan. Built once, then shared read-only by every worker.
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
    by_id: FxHashMap<&'static str, usize>,
    by_kind: FxHashMap<NodeKind, SmallVec8<usize>>,
}

impl RuleRegistry {
    /// Registry of the built-in rules.
    pub fn builtin() -> Self {
        Self::new(super::builtin_rules())
    }

    /// Build the indexes. A rule whose id is already registered is dropped.
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        let mut kept: Vec<Box<dyn Rule>> = Vec::with_capacity(rules.len());
        let mut by_id = FxHashMap::default();
        let mut by_kind: FxHashMap<NodeKind, SmallVec8<usize>> = FxHashMap::default();

        for rule in rules {
            let id = rule.meta().id;
            if by_id.contains_key(id) {
                tracing::warn!(rule = id, "duplicate rule id, keeping the first registration");
                continue;
            }
            let index = kept.len();
            by_id.insert(id, index);
            for kind in rule.node_kinds() {
                let slot = by_kind.entry(*kind).or_default();
                if !slot.contains(&index) {
                    slot.push(index);
                }
            }
            kept.push(rule);
        }

        Self {
            rules: kept,
            by_id,
            by_kind,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule at a registry index.
    pub fn get(&self, index: usize) -> Option<&dyn Rule> {
        self.rules.get(index).map(|r| r.as_ref())
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn by_id(&self, id: &str) -> Option<&dyn Rule> {
        self.index_of(id).and_then(|i| self.get(i))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Indexes of the rules visiting `kind`, in registration order.
    pub fn for_kind(&self, kind: NodeKind) -> &[usize] {
        self.by_kind.get(&kind).map_or(&[][..], |v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.meta().id)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
