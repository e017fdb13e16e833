//! Tree-sitter to `SourceTree` normalization.
//!
//! Each language supplies a `LanguageNormalizer` that classifies one
//! concrete-syntax node at a time. The walk itself is shared, iterative and
//! bottom-up: children are pushed to the arena before their parent, so the
//! resulting tree is acyclic by construction. Only named tree-sitter nodes are
//! visited; punctuation and keywords never reach a mapping.

use smallvec::SmallVec;

use crate::tree::{Node, NodeId, NodeKind, SourceTree, Span};

/// What a concrete-syntax node becomes in the normalized tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    /// A node whose children are the normalized named children.
    Keep(NodeKind, Option<String>),
    /// A childless node; the subtree is not visited.
    Leaf(NodeKind, Option<String>),
    /// No node of its own; normalized children are spliced into the parent.
    Flatten,
    /// Like `Flatten`, but decorator children are moved onto the function
    /// or class they precede (Python `decorated_definition`).
    Decorated,
    /// Skip the node and its subtree.
    Drop,
}

/// A named child as seen by a mapping: the node, the field it occupies in
/// its parent, and the parent's kind.
#[derive(Clone, Copy)]
pub struct Child<'t> {
    pub node: tree_sitter::Node<'t>,
    pub field: Option<&'static str>,
    pub parent_kind: &'static str,
}

/// Per-language classification of concrete-syntax nodes.
pub trait LanguageNormalizer {
    fn map(&self, child: Child<'_>, source: &[u8]) -> Mapping;

    /// Rearrange the children of a kept node before it is allocated.
    fn fixup(&self, _ts_kind: &str, _kind: NodeKind, _children: &mut Vec<NodeId>, _nodes: &[Node]) {}
}

struct Frame<'t> {
    ts: tree_sitter::Node<'t>,
    mapping: Mapping,
    pending: Vec<Child<'t>>,
    children: Vec<NodeId>,
}

impl<'t> Frame<'t> {
    fn new(ts: tree_sitter::Node<'t>, mapping: Mapping) -> Self {
        let pending = named_children(ts);
        Self {
            ts,
            mapping,
            pending,
            children: Vec::new(),
        }
    }
}

/// Named children of `node` in reverse source order, ready to be popped.
fn named_children(node: tree_sitter::Node<'_>) -> Vec<Child<'_>> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if child.is_named() && !child.is_missing() {
                out.push(Child {
                    node: child,
                    field: cursor.field_name(),
                    parent_kind: node.kind(),
                });
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    out.reverse();
    out
}

/// 1-based span of a tree-sitter node, end exclusive.
pub fn span_of(node: tree_sitter::Node<'_>) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(
        start.row as u32 + 1,
        start.column as u32 + 1,
        end.row as u32 + 1,
        end.column as u32 + 1,
    )
}

/// Source text of a node.
pub fn node_text<'s>(node: tree_sitter::Node<'_>, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or_default()
}

/// Source text of a field child.
pub fn field_text<'s>(node: tree_sitter::Node<'_>, field: &str, source: &'s [u8]) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| node_text(n, source))
}

/// Text of the first anonymous child, e.g. the operator of a binary node.
pub fn operator_text<'s>(node: tree_sitter::Node<'_>, source: &'s [u8]) -> Option<&'s str> {
    if let Some(op) = node.child_by_field_name("operator") {
        return Some(node_text(op, source));
    }
    let mut cursor = node.walk();
    let op = node
        .children(&mut cursor)
        .find(|c| !c.is_named())
        .map(|c| node_text(c, source));
    op
}

/// Normalize a whole tree-sitter tree. The root always becomes `Program`.
pub fn normalize(
    normalizer: &dyn LanguageNormalizer,
    root: tree_sitter::Node<'_>,
    source: &[u8],
) -> SourceTree {
    let mut nodes: Vec<Node> = Vec::new();
    let mut stack = vec![Frame::new(root, Mapping::Keep(NodeKind::Program, None))];
    let mut root_id = None;

    while let Some(frame) = stack.last_mut() {
        if let Some(child) = frame.pending.pop() {
            match normalizer.map(child, source) {
                Mapping::Drop => {}
                Mapping::Leaf(kind, text) => {
                    let id = alloc(&mut nodes, kind, span_of(child.node), text, Vec::new());
                    frame.children.push(id);
                }
                mapping => stack.push(Frame::new(child.node, mapping)),
            }
            continue;
        }

        let Some(frame) = stack.pop() else { break };
        let produced = close(normalizer, frame, &mut nodes);
        match stack.last_mut() {
            Some(parent) => parent.children.extend(produced),
            None => root_id = produced.first().copied(),
        }
    }

    let root = match root_id {
        Some(id) => id,
        None => alloc(&mut nodes, NodeKind::Program, span_of(root), None, Vec::new()),
    };
    SourceTree::from_parts(nodes, root)
}

fn alloc(
    nodes: &mut Vec<Node>,
    kind: NodeKind,
    span: Span,
    text: Option<String>,
    children: Vec<NodeId>,
) -> NodeId {
    let id = NodeId(nodes.len() as u32);
    nodes.push(Node {
        kind,
        span,
        children: SmallVec::from_vec(children),
        text,
    });
    id
}

/// Finish a frame; returns the ids that belong in the parent's child list.
fn close(normalizer: &dyn LanguageNormalizer, frame: Frame<'_>, nodes: &mut Vec<Node>) -> Vec<NodeId> {
    let Frame {
        ts,
        mapping,
        mut children,
        ..
    } = frame;
    match mapping {
        Mapping::Flatten => children,
        Mapping::Decorated => attach_decorators(nodes, children),
        Mapping::Keep(kind, mut text) => {
            match kind {
                NodeKind::Function => shape_function(nodes, &mut children, span_of(ts)),
                NodeKind::Decorator => shape_decorator(nodes, &mut children, &mut text),
                NodeKind::Export | NodeKind::Block => children = attach_decorators(nodes, children),
                _ => {}
            }
            normalizer.fixup(ts.kind(), kind, &mut children, nodes);
            vec![alloc(nodes, kind, span_of(ts), text, children)]
        }
        Mapping::Leaf(kind, text) => vec![alloc(nodes, kind, span_of(ts), text, Vec::new())],
        Mapping::Drop => Vec::new(),
    }
}

/// Order function children as parameters, decorators, anything else, body.
/// An expression body (`x => x + 1`, `lambda`) is wrapped in a `Block`.
fn shape_function(nodes: &mut Vec<Node>, children: &mut Vec<NodeId>, span: Span) {
    let mut params = Vec::new();
    let mut decorators = Vec::new();
    let mut others = Vec::new();
    let mut body = None;
    for id in children.drain(..) {
        match nodes[id.index()].kind {
            NodeKind::Parameter => params.push(id),
            NodeKind::Decorator => decorators.push(id),
            NodeKind::Block if body.is_none() => body = Some(id),
            _ => others.push(id),
        }
    }
    let body = match body {
        Some(block) => block,
        None => {
            let block_span = match (others.first(), others.last()) {
                (Some(first), Some(last)) => {
                    let (a, b) = (nodes[first.index()].span, nodes[last.index()].span);
                    Span::new(a.start_line, a.start_column, b.end_line, b.end_column)
                }
                _ => Span::point(span.end_line, span.end_column),
            };
            let statements = std::mem::take(&mut others);
            alloc(nodes, NodeKind::Block, block_span, None, statements)
        }
    };
    children.extend(params);
    children.extend(decorators);
    children.extend(others);
    children.push(body);
}

/// A decorator's text is its dotted name. A decorator with arguments keeps
/// the call as its only child; a bare one keeps no children.
fn shape_decorator(nodes: &[Node], children: &mut Vec<NodeId>, text: &mut Option<String>) {
    let Some(expr) = children.first().copied() else {
        return;
    };
    match nodes[expr.index()].kind {
        NodeKind::Call => {
            let callee = nodes[expr.index()].children.first().copied();
            *text = callee.and_then(|c| dotted_path(nodes, c));
            children.truncate(1);
        }
        NodeKind::Identifier | NodeKind::Member => {
            *text = dotted_path(nodes, expr);
            children.clear();
        }
        _ => {}
    }
}

/// Move each run of `Decorator` ids onto the function or class that
/// follows it. Returns the remaining ids; decorators with nothing to
/// decorate stay in place.
fn attach_decorators(nodes: &mut [Node], children: Vec<NodeId>) -> Vec<NodeId> {
    let mut rest = Vec::with_capacity(children.len());
    let mut pending: Vec<NodeId> = Vec::new();
    for id in children {
        match nodes[id.index()].kind {
            NodeKind::Decorator => pending.push(id),
            NodeKind::Function | NodeKind::Class if !pending.is_empty() => {
                let insert_at = if nodes[id.index()].kind == NodeKind::Function {
                    let target = &nodes[id.index()];
                    target
                        .children
                        .iter()
                        .position(|c| nodes[c.index()].kind != NodeKind::Parameter)
                        .unwrap_or(target.children.len())
                } else {
                    0
                };
                let target_children = &mut nodes[id.index()].children;
                for (offset, decorator) in pending.drain(..).enumerate() {
                    target_children.insert(insert_at + offset, decorator);
                }
                rest.push(id);
            }
            _ => {
                rest.append(&mut pending);
                rest.push(id);
            }
        }
    }
    rest.append(&mut pending);
    rest
}

/// Dotted path over a partially built arena: `app.route`, `login_required`.
fn dotted_path(nodes: &[Node], id: NodeId) -> Option<String> {
    let node = &nodes[id.index()];
    match node.kind {
        NodeKind::Identifier => node.text.clone(),
        NodeKind::Member => {
            let prop = node.text.as_deref()?;
            match node.children.first().and_then(|o| dotted_path(nodes, *o)) {
                Some(object) => Some(format!("{object}.{prop}")),
                None => Some(prop.to_string()),
            }
        }
        NodeKind::Call | NodeKind::New => node.children.first().and_then(|c| dotted_path(nodes, *c)),
        _ => None,
    }
}

/// Strip quotes and string prefixes (`r`, `b`, `f`, `u`) from a literal.
pub fn unquote(raw: &str) -> &str {
    let body = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'", "`"] {
        if let Some(inner) = body.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    body
}
