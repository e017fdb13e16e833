//! Visitor and reducer contexts.

use super::finding::Fact;
use crate::engine::FileIndex;
use crate::patterns::PatternContext;
use crate::tree::{Language, NodeId, NodeKind, SourceTree, SourceUnit, Span};

/// Everything a visitor may look at for one node.
#[derive(Clone, Copy)]
pub struct VisitContext<'a> {
    pub unit: &'a SourceUnit,
    pub tree: &'a SourceTree,
    pub node: NodeId,
    /// Enclosing nodes, root first, parent last.
    pub ancestors: &'a [NodeId],
    pub patterns: &'a PatternContext,
    pub file: &'a FileIndex,
}

impl<'a> VisitContext<'a> {
    pub fn language(&self) -> Language {
        self.unit.language
    }

    pub fn kind(&self) -> NodeKind {
        self.tree.kind(self.node)
    }

    pub fn text(&self) -> Option<&'a str> {
        self.tree.text(self.node)
    }

    pub fn span(&self) -> Span {
        self.tree.span(self.node)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.ancestors.last().copied()
    }

    /// Nearest ancestor of `kind`.
    pub fn nearest(&self, kind: NodeKind) -> Option<NodeId> {
        self.ancestors
            .iter()
            .rev()
            .copied()
            .find(|a| self.tree.kind(*a) == kind)
    }

    /// Ancestors from parent outwards, stopping before the enclosing function.
    pub fn ancestors_in_function(&self) -> impl Iterator<Item = NodeId> + 'a {
        let tree = self.tree;
        self.ancestors
            .iter()
            .rev()
            .copied()
            .take_while(move |a| tree.kind(*a) != NodeKind::Function)
    }

    pub fn enclosing_function(&self) -> Option<NodeId> {
        self.nearest(NodeKind::Function)
    }

    /// Enclosing function, or the program root at top level.
    pub fn scope(&self) -> NodeId {
        self.enclosing_function().unwrap_or_else(|| self.tree.root())
    }

    /// The call this node is a direct argument of (not its callee).
    pub fn direct_call_parent(&self) -> Option<NodeId> {
        let parent = self.parent()?;
        if !self.tree.kind(parent).is_call_like() {
            return None;
        }
        (self.tree.callee(parent) != Some(self.node)).then_some(parent)
    }

    /// Name of the function at `ancestors.len()` depth: its own name, or the
    /// name it is bound to (`const getUser = () => ...`, `{ getUser() {} }`).
    pub fn function_name(&self) -> Option<&'a str> {
        function_name(self.tree, self.node, self.parent())
    }

    /// Name of the nearest enclosing binding (declarator, assignment, property)
    /// inside the current function, or else the enclosing function's name.
    pub fn enclosing_binding_name(&self) -> Option<&'a str> {
        let tree = self.tree;
        for (depth, ancestor) in self.ancestors.iter().enumerate().rev() {
            match tree.kind(*ancestor) {
                NodeKind::VariableDeclarator | NodeKind::Assignment | NodeKind::Property => {
                    if let Some(name) = tree.binding_name(*ancestor) {
                        return Some(name);
                    }
                }
                NodeKind::Function => {
                    let parent = depth.checked_sub(1).map(|d| self.ancestors[d]);
                    return function_name(tree, *ancestor, parent);
                }
                _ => {}
            }
        }
        None
    }

    /// Siblings preceding the statement that contains the current node, in
    /// source order. The statement is the outermost ancestor below the
    /// nearest block or program.
    pub fn preceding_siblings(&self) -> &'a [NodeId] {
        let tree = self.tree;
        let mut child = self.node;
        for ancestor in self.ancestors.iter().rev().copied() {
            if matches!(tree.kind(ancestor), NodeKind::Block | NodeKind::Program) {
                let children = tree.children(ancestor);
                let idx = children.iter().position(|c| *c == child).unwrap_or(0);
                return &children[..idx];
            }
            child = ancestor;
        }
        &[]
    }
}

/// Own or bound name of a function node given its parent.
pub fn function_name<'t>(
    tree: &'t SourceTree,
    function: NodeId,
    parent: Option<NodeId>,
) -> Option<&'t str> {
    if let Some(name) = tree.text(function) {
        return Some(name);
    }
    let parent = parent?;
    match tree.kind(parent) {
        NodeKind::VariableDeclarator | NodeKind::Property | NodeKind::Assignment => {
            tree.binding_name(parent)
        }
        _ => None,
    }
}

/// Input to a rule's whole-program reduce pass.
pub struct ReduceContext<'a> {
    /// Facts this rule recorded across all scanned units.
    pub facts: &'a [Fact],
    pub units_scanned: usize,
    /// Units whose facts for this rule may be incomplete: outside the rule's
    /// paths, timed out, or where the rule panicked.
    pub units_partial: usize,
    pub patterns: &'a PatternContext,
}

impl ReduceContext<'_> {
    pub fn has_fact(&self, key: &str) -> bool {
        self.facts.iter().any(|f| f.key == key)
    }
}
