//! Programmatic tree construction.
//!
//! Used by tests, benches and any producer that is not a tree-sitter
//! normalizer. Children are allocated before their parent, so a tree built
//! only from ids this builder returned is acyclic. `finish` does not check
//! ids passed to `node` by hand; `SourceTree::check` does.

use smallvec::SmallVec;

use super::arena::{SourceTree, SourceUnit};
use super::node::{Language, Node, NodeId, NodeKind, Span};

/// Bottom-up builder. Every node lands on the current line; columns advance
/// so that sibling nodes get distinct spans.
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    line: u32,
    column: u32,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            line: 1,
            column: 1,
        }
    }

    /// Move subsequent nodes to `line`.
    pub fn line(&mut self, line: u32) -> &mut Self {
        self.line = line.max(1);
        self.column = 1;
        self
    }

    pub fn node(&mut self, kind: NodeKind, text: Option<&str>, children: Vec<NodeId>) -> NodeId {
        let span = Span::new(self.line, self.column, self.line, self.column + 1);
        self.column += 2;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            children: SmallVec::from_vec(children),
            text: text.map(str::to_string),
        });
        id
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.node(NodeKind::Identifier, Some(name), vec![])
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.node(NodeKind::StringLiteral, Some(value), vec![])
    }

    pub fn number(&mut self, raw: &str) -> NodeId {
        self.node(NodeKind::NumberLiteral, Some(raw), vec![])
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        let text = if value { "true" } else { "false" };
        self.node(NodeKind::BoolLiteral, Some(text), vec![])
    }

    /// Template literal; `head` is its leading static text.
    pub fn template(&mut self, head: &str, parts: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::TemplateLiteral, Some(head), parts)
    }

    pub fn member(&mut self, object: NodeId, property: &str) -> NodeId {
        self.node(NodeKind::Member, Some(property), vec![object])
    }

    /// Identifier or member chain for a dotted path such as `jwt.sign`.
    pub fn path(&mut self, dotted: &str) -> NodeId {
        let mut segments = dotted.split('.');
        let first = segments.next().unwrap_or(dotted);
        let mut current = self.ident(first);
        for segment in segments {
            current = self.member(current, segment);
        }
        current
    }

    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        let mut children = vec![callee];
        children.extend(args);
        self.node(NodeKind::Call, None, children)
    }

    /// Call whose callee is built from a dotted path.
    pub fn call_path(&mut self, dotted: &str, args: Vec<NodeId>) -> NodeId {
        let callee = self.path(dotted);
        self.call(callee, args)
    }

    pub fn new_expr(&mut self, dotted: &str, args: Vec<NodeId>) -> NodeId {
        let callee = self.path(dotted);
        let mut children = vec![callee];
        children.extend(args);
        self.node(NodeKind::New, None, children)
    }

    pub fn prop(&mut self, key: &str, value: NodeId) -> NodeId {
        self.node(NodeKind::Property, Some(key), vec![value])
    }

    pub fn object(&mut self, props: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::ObjectLiteral, None, props)
    }

    pub fn array(&mut self, items: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::ArrayLiteral, None, items)
    }

    /// `const name = value`.
    pub fn declare(&mut self, name: &str, value: NodeId) -> NodeId {
        let target = self.ident(name);
        self.node(NodeKind::VariableDeclarator, Some(name), vec![target, value])
    }

    pub fn assign(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.node(NodeKind::Assignment, Some("="), vec![target, value])
    }

    pub fn param(&mut self, name: &str) -> NodeId {
        self.node(NodeKind::Parameter, Some(name), vec![])
    }

    pub fn typed_param(&mut self, name: &str, type_name: &str) -> NodeId {
        let ty = self.node(NodeKind::TypeRef, Some(type_name), vec![]);
        self.node(NodeKind::Parameter, Some(name), vec![ty])
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Block, None, statements)
    }

    /// Function with parameters, decorators and a block body.
    pub fn function(
        &mut self,
        name: Option<&str>,
        params: Vec<NodeId>,
        decorators: Vec<NodeId>,
        body: Vec<NodeId>,
    ) -> NodeId {
        let body = self.block(body);
        let mut children = params;
        children.extend(decorators);
        children.push(body);
        self.node(NodeKind::Function, name, children)
    }

    pub fn decorator(&mut self, name: &str, args: Vec<NodeId>) -> NodeId {
        let children = if args.is_empty() {
            vec![]
        } else {
            vec![self.call_path(name, args)]
        };
        self.node(NodeKind::Decorator, Some(name), children)
    }

    pub fn comment(&mut self, text: &str) -> NodeId {
        self.node(NodeKind::Comment, Some(text), vec![])
    }

    pub fn import(&mut self, source: &str, names: &[&str]) -> NodeId {
        let children = names.iter().map(|n| self.ident(n)).collect();
        self.node(NodeKind::Import, Some(source), children)
    }

    pub fn ret(&mut self, value: NodeId) -> NodeId {
        self.node(NodeKind::Return, None, vec![value])
    }

    pub fn if_stmt(&mut self, condition: NodeId, then: Vec<NodeId>) -> NodeId {
        let then = self.block(then);
        self.node(NodeKind::If, None, vec![condition, then])
    }

    pub fn unary(&mut self, op: &str, operand: NodeId) -> NodeId {
        self.node(NodeKind::UnaryOp, Some(op), vec![operand])
    }

    pub fn binary(&mut self, op: &str, left: NodeId, right: NodeId) -> NodeId {
        self.node(NodeKind::BinaryOp, Some(op), vec![left, right])
    }

    /// Wrap `top_level` in a `Program` root and finish the tree.
    pub fn finish(mut self, top_level: Vec<NodeId>) -> SourceTree {
        let end = self.line + 1;
        let root = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind: NodeKind::Program,
            span: Span::new(1, 1, end, 1),
            children: SmallVec::from_vec(top_level),
            text: None,
        });
        SourceTree::from_parts(self.nodes, root)
    }

    /// Finish into a `SourceUnit`.
    pub fn unit(self, path: &str, language: Language, top_level: Vec<NodeId>) -> SourceUnit {
        SourceUnit::new(path, language, self.finish(top_level))
    }
}
