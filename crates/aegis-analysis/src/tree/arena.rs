//! `SourceTree` arena and `SourceUnit`.

use serde::{Deserialize, Serialize};

use super::node::{Language, Node, NodeId, NodeKind, Span};

/// The parsed structural representation of one source file.
///
/// Deserialized trees go through the same checks as `from_nodes`, so every
/// child id is in range and the nodes below the root form a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTree")]
pub struct SourceTree {
    nodes: Vec<Node>,
    root: NodeId,
}

/// Unchecked wire form of `SourceTree`.
#[derive(Deserialize)]
struct RawTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl TryFrom<RawTree> for SourceTree {
    type Error = String;

    fn try_from(raw: RawTree) -> Result<Self, String> {
        Self::from_nodes(raw.nodes, raw.root)
    }
}

impl SourceTree {
    /// Build a tree from raw nodes. Fails if a child id is out of range,
    /// a node is reachable twice, or the root does not exist.
    pub fn from_nodes(nodes: Vec<Node>, root: NodeId) -> Result<Self, String> {
        let tree = Self { nodes, root };
        tree.check()?;
        Ok(tree)
    }

    /// Trees assembled bottom-up (children allocated before parents)
    /// cannot contain cycles.
    pub(crate) fn from_parts(nodes: Vec<Node>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    /// Re-run the structural checks. Trees from `TreeBuilder` skip them at
    /// construction, so loaders that accept foreign trees call this.
    pub fn check(&self) -> Result<(), String> {
        if self.root.index() >= self.nodes.len() {
            return Err(format!("root {} out of range", self.root.0));
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let slot = seen
                .get_mut(id.index())
                .ok_or_else(|| format!("child id {} out of range", id.0))?;
            if *slot {
                return Err(format!("node {} is reachable more than once", id.0));
            }
            *slot = true;
            if let Some(node) = self.nodes.get(id.index()) {
                stack.extend(node.children.iter().copied());
            }
        }
        Ok(())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// All nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).text()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    pub fn first_child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.kind(*c) == kind)
    }

    /// Preorder iterator over `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Callee of a `Call`/`New` node.
    pub fn callee(&self, call: NodeId) -> Option<NodeId> {
        if self.kind(call).is_call_like() {
            self.child(call, 0)
        } else {
            None
        }
    }

    /// Argument nodes of a `Call`/`New` node, skipping type arguments.
    pub fn call_args(&self, call: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let children = if self.kind(call).is_call_like() {
            self.children(call).get(1..).unwrap_or(&[])
        } else {
            &[]
        };
        children
            .iter()
            .copied()
            .filter(move |c| self.kind(*c) != NodeKind::TypeRef)
    }

    /// Dotted name of a callee expression: `jwt.sign`, `crypto.createHash`.
    /// Intermediate calls collapse to their own callee path, so
    /// `express().use` yields `express.use`.
    pub fn dotted_path(&self, id: NodeId) -> Option<String> {
        let node = self.node(id);
        match node.kind {
            NodeKind::Identifier => node.text.clone(),
            NodeKind::Member => {
                let prop = node.text()?;
                match self.child(id, 0).and_then(|obj| self.dotted_path(obj)) {
                    Some(obj) => Some(format!("{obj}.{prop}")),
                    None => Some(prop.to_string()),
                }
            }
            NodeKind::Call | NodeKind::New => self.callee(id).and_then(|c| self.dotted_path(c)),
            _ => None,
        }
    }

    /// Dotted callee name of a `Call`/`New` node.
    pub fn callee_path(&self, call: NodeId) -> Option<String> {
        self.callee(call).and_then(|c| self.dotted_path(c))
    }

    /// Value of a string literal, or of a template literal without
    /// substitutions.
    pub fn string_value(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id);
        match node.kind {
            NodeKind::StringLiteral => node.text(),
            NodeKind::TemplateLiteral if node.children.is_empty() => node.text(),
            _ => None,
        }
    }

    /// Leading static text of a string or template literal.
    pub fn string_prefix(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::StringLiteral | NodeKind::TemplateLiteral => self.text(id),
            _ => None,
        }
    }

    /// `Property` child of an object literal whose key equals `key`
    /// (ASCII case-insensitive).
    pub fn property(&self, object: NodeId, key: &str) -> Option<NodeId> {
        if self.kind(object) != NodeKind::ObjectLiteral {
            return None;
        }
        self.children(object).iter().copied().find(|c| {
            self.kind(*c) == NodeKind::Property
                && self.text(*c).is_some_and(|k| k.eq_ignore_ascii_case(key))
        })
    }

    /// Value of a `Property` node. Shorthand properties have none.
    pub fn property_value(&self, property: NodeId) -> Option<NodeId> {
        self.children(property).last().copied()
    }

    /// Value side of a `VariableDeclarator` or `Assignment`
    /// (`[target, value]`, optionally with a type between).
    pub fn binding_value(&self, id: NodeId) -> Option<NodeId> {
        let children = self.children(id);
        if children.len() < 2 {
            return None;
        }
        children
            .last()
            .copied()
            .filter(|c| self.kind(*c) != NodeKind::TypeRef)
    }

    /// Target of a `VariableDeclarator` or `Assignment`.
    pub fn binding_target(&self, id: NodeId) -> Option<NodeId> {
        self.child(id, 0)
    }

    /// Name bound by a declarator/assignment/property: the declarator name,
    /// the assigned identifier, or the last segment of an assigned member.
    pub fn binding_name(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id);
        match node.kind {
            NodeKind::VariableDeclarator | NodeKind::Property | NodeKind::Parameter => {
                node.text()
            }
            NodeKind::Assignment => {
                let target = self.binding_target(id)?;
                match self.kind(target) {
                    NodeKind::Identifier | NodeKind::Member => self.text(target),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Name of every `Identifier` and `Member` in the subtree, in preorder.
    pub fn referenced_names(&self, id: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.descendants(id).filter_map(move |d| match self.kind(d) {
            NodeKind::Identifier | NodeKind::Member => self.text(d),
            _ => None,
        })
    }
}

/// Preorder iterator returned by `SourceTree::descendants`.
pub struct Descendants<'a> {
    tree: &'a SourceTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// One parsed file handed to the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Path relative to the scan root, `/`-separated.
    pub path: String,
    pub language: Language,
    pub tree: SourceTree,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>, language: Language, tree: SourceTree) -> Self {
        Self {
            path: path.into(),
            language,
            tree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeBuilder;

    #[test]
    fn test_rejects_shared_child() {
        let span = Span::point(1, 1);
        let mut a = Node::new(NodeKind::Program, span);
        a.children.push(NodeId(1));
        a.children.push(NodeId(1));
        let b = Node::new(NodeKind::Identifier, span);
        assert!(SourceTree::from_nodes(vec![a, b], NodeId(0)).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_child() {
        let mut a = Node::new(NodeKind::Program, Span::point(1, 1));
        a.children.push(NodeId(7));
        assert!(SourceTree::from_nodes(vec![a], NodeId(0)).is_err());
    }

    #[test]
    fn test_rejects_child_cycle() {
        let span = Span::point(1, 1);
        let mut program = Node::new(NodeKind::Program, span);
        program.children.push(NodeId(1));
        let mut call = Node::new(NodeKind::Call, span);
        call.children.push(NodeId(1));
        assert!(SourceTree::from_nodes(vec![program, call], NodeId(0)).is_err());
    }

    #[test]
    fn test_deserialize_runs_checks() {
        let bad_child = r#"{"nodes":[{"kind":"Program","span":{"startLine":1,"startColumn":1,"endLine":1,"endColumn":1},"children":[99]}],"root":0}"#;
        let err = serde_json::from_str::<SourceTree>(bad_child).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");

        let self_loop = r#"{"nodes":[{"kind":"Program","span":{"startLine":1,"startColumn":1,"endLine":1,"endColumn":1},"children":[0]}],"root":0}"#;
        assert!(serde_json::from_str::<SourceTree>(self_loop).is_err());

        let mut b = TreeBuilder::new();
        let x = b.ident("x");
        let tree = b.finish(vec![x]);
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(serde_json::from_str::<SourceTree>(&json).unwrap(), tree);
    }

    #[test]
    fn test_dotted_path_through_calls() {
        let mut b = TreeBuilder::new();
        let express = b.ident("express");
        let inner = b.call(express, vec![]);
        let member = b.member(inner, "use");
        let limiter = b.ident("limiter");
        let outer = b.call(member, vec![limiter]);
        let tree = b.finish(vec![outer]);
        assert_eq!(tree.callee_path(outer).as_deref(), Some("express.use"));
        assert_eq!(tree.call_args(outer).count(), 1);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut b = TreeBuilder::new();
        let x = b.ident("x");
        let y = b.ident("y");
        let call = b.call(x, vec![y]);
        let tree = b.finish(vec![call]);
        let order: Vec<_> = tree.descendants(tree.root()).collect();
        assert_eq!(order, vec![tree.root(), call, x, y]);
    }
}
