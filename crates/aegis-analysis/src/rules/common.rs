//! Small tree queries shared by several rules.

use rustc_hash::FxHashSet;

use crate::patterns::request::is_request_derived;
use crate::patterns::{normalize_name, KeywordSet};
use crate::tree::{NodeId, NodeKind, SourceTree};

/// Last segment of a dotted path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Segment before the last one, if any.
pub fn object_segment(path: &str) -> Option<&str> {
    let (object, _) = path.rsplit_once('.')?;
    Some(last_segment(object))
}

/// Whether `path` is `target` or ends with `.target`.
pub fn path_is(path: &str, target: &str) -> bool {
    path == target
        || (path.len() > target.len()
            && path.ends_with(target)
            && path.as_bytes()[path.len() - target.len() - 1] == b'.')
}

/// Boolean literal value (`true`, `True`, `false`, `False`).
pub fn bool_value(tree: &SourceTree, id: NodeId) -> Option<bool> {
    if tree.kind(id) != NodeKind::BoolLiteral {
        return None;
    }
    match tree.text(id)? {
        "true" | "True" => Some(true),
        "false" | "False" => Some(false),
        _ => None,
    }
}

/// Numeric literal value, ignoring `_` separators.
pub fn number_value(tree: &SourceTree, id: NodeId) -> Option<f64> {
    if tree.kind(id) != NodeKind::NumberLiteral {
        return None;
    }
    let raw: String = tree.text(id)?.chars().filter(|c| *c != '_').collect();
    raw.parse().ok()
}

/// Keyword option passed to a call: a Python keyword argument, or a
/// property of an object-literal argument after the first one.
pub fn call_option(tree: &SourceTree, call: NodeId, key: &str) -> Option<NodeId> {
    let mut objects = Vec::new();
    for (i, arg) in tree.call_args(call).enumerate() {
        match tree.kind(arg) {
            NodeKind::Property if tree.text(arg).is_some_and(|k| k == key) => return Some(arg),
            NodeKind::ObjectLiteral if i > 0 => objects.push(arg),
            _ => {}
        }
    }
    objects.into_iter().find_map(|o| tree.property(o, key))
}

/// Options object of a call: the last object-literal argument after the first.
pub fn options_object(tree: &SourceTree, call: NodeId) -> Option<NodeId> {
    tree.call_args(call)
        .skip(1)
        .filter(|a| tree.kind(*a) == NodeKind::ObjectLiteral)
        .last()
}

/// Whether any call inside `scope` has a callee matching `keywords`.
pub fn calls_matching(tree: &SourceTree, scope: NodeId, keywords: &KeywordSet) -> bool {
    tree.descendants(scope).any(|d| {
        tree.kind(d).is_call_like()
            && tree.callee_path(d).is_some_and(|p| keywords.matches(&p))
    })
}

/// Whether a name or callee in the subtree matches `keywords`.
pub fn mentions(tree: &SourceTree, id: NodeId, keywords: &KeywordSet) -> bool {
    tree.descendants(id).any(|d| match tree.kind(d) {
        NodeKind::Identifier | NodeKind::Member | NodeKind::Decorator | NodeKind::Property => {
            tree.text(d).is_some_and(|t| keywords.matches(t))
        }
        _ => false,
    })
}

/// Type-check expressions: `typeof`, `instanceof`, `isinstance`,
/// `Array.isArray`, `Number.isInteger`, ...
pub fn is_type_check(tree: &SourceTree, id: NodeId) -> bool {
    tree.descendants(id).any(|d| match tree.kind(d) {
        NodeKind::UnaryOp => tree.text(d) == Some("typeof"),
        NodeKind::BinaryOp => tree.text(d) == Some("instanceof"),
        NodeKind::Call => tree.callee_path(d).is_some_and(|p| {
            let last = normalize_name(last_segment(&p));
            matches!(
                last.as_str(),
                "isinstance" | "isarray" | "isinteger" | "isplainobject" | "issubclass"
                    | "isvalid" | "checktype" | "validate" | "safeparse"
            )
        }),
        _ => false,
    })
}

/// Whether a conditional inside `scope` tests the type of something.
pub fn scope_has_type_check(tree: &SourceTree, scope: NodeId) -> bool {
    tree.descendants(scope).any(|d| {
        matches!(tree.kind(d), NodeKind::If | NodeKind::Conditional)
            && tree.child(d, 0).is_some_and(|cond| is_type_check(tree, cond))
    })
}

/// Names bound from request data inside `scope`:
/// `const id = req.params.id`, `const { name } = req.body`,
/// `data = request.get_json()`.
pub fn request_bound_names(tree: &SourceTree, scope: NodeId) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    for d in tree.descendants(scope) {
        if !matches!(tree.kind(d), NodeKind::VariableDeclarator | NodeKind::Assignment) {
            continue;
        }
        let (Some(target), Some(value)) = (tree.binding_target(d), tree.binding_value(d)) else {
            continue;
        };
        if !is_request_derived(tree, value) {
            continue;
        }
        for t in tree.descendants(target) {
            if matches!(tree.kind(t), NodeKind::Identifier | NodeKind::Property) {
                if let Some(name) = tree.text(t) {
                    names.insert(name.to_string());
                }
            }
        }
    }
    names
}

/// Whether `id` reads request data directly or through a name bound from it.
pub fn is_tainted(tree: &SourceTree, id: NodeId, bound: &FxHashSet<String>) -> bool {
    is_request_derived(tree, id)
        || tree.descendants(id).any(|d| {
            tree.kind(d) == NodeKind::Identifier && tree.text(d).is_some_and(|t| bound.contains(t))
        })
}

/// Initializer of a local bound exactly once inside `scope`, so that a
/// sink call on `q` is judged by the template `q` was built from. Returns
/// `id` itself when it is not such a local.
pub fn resolve_local(tree: &SourceTree, scope: NodeId, id: NodeId) -> NodeId {
    if tree.kind(id) != NodeKind::Identifier {
        return id;
    }
    let Some(name) = tree.text(id) else {
        return id;
    };
    let mut bindings = tree.descendants(scope).filter(|d| match tree.kind(*d) {
        NodeKind::VariableDeclarator => tree.binding_name(*d) == Some(name),
        NodeKind::Assignment => tree.binding_target(*d).is_some_and(|t| {
            tree.kind(t) == NodeKind::Identifier && tree.text(t) == Some(name)
        }),
        _ => false,
    });
    match (bindings.next(), bindings.next()) {
        (Some(only), None) => tree.binding_value(only).unwrap_or(id),
        _ => id,
    }
}

/// Static text of a string-building expression: literal values and template
/// text joined across `+`, `%` and `.format` chains.
pub fn static_text(tree: &SourceTree, id: NodeId) -> String {
    let mut out = String::new();
    for d in tree.descendants(id) {
        if matches!(tree.kind(d), NodeKind::StringLiteral | NodeKind::TemplateLiteral) {
            if let Some(t) = tree.text(d) {
                out.push_str(t);
                out.push(' ');
            }
        }
    }
    out
}

/// Whether the expression builds a string from parts: a template with
/// substitutions, a `+`/`%` concatenation, or a `.format(...)` call.
pub fn is_interpolated(tree: &SourceTree, id: NodeId) -> bool {
    match tree.kind(id) {
        NodeKind::TemplateLiteral => !tree.children(id).is_empty(),
        NodeKind::BinaryOp => matches!(tree.text(id), Some("+" | "%")),
        NodeKind::Call => tree
            .callee_path(id)
            .is_some_and(|p| last_segment(&p) == "format" || p == "String.format"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeBuilder;

    #[test]
    fn test_path_is() {
        assert!(path_is("pickle.loads", "pickle.loads"));
        assert!(path_is("my.pickle.loads", "pickle.loads"));
        assert!(!path_is("unpickle.loads", "pickle.loads"));
    }

    #[test]
    fn test_resolve_local_follows_single_binding() {
        let mut b = TreeBuilder::new();
        let head = b.string("SELECT 1");
        let once = b.declare("q", head);
        let use_once = b.ident("q");
        let first = b.string("a");
        let twice = b.declare("r", first);
        let target = b.ident("r");
        let second = b.string("b");
        let reassign = b.assign(target, second);
        let use_twice = b.ident("r");
        let f = b.function(Some("h"), vec![], vec![], vec![once, use_once, twice, reassign, use_twice]);
        let tree = b.finish(vec![f]);

        assert_eq!(resolve_local(&tree, f, use_once), head);
        assert_eq!(resolve_local(&tree, f, use_twice), use_twice);
        assert_eq!(resolve_local(&tree, f, head), head);
    }

    #[test]
    fn test_request_bound_names() {
        let mut b = TreeBuilder::new();
        let src = b.path("req.params.id");
        let decl = b.declare("id", src);
        let other_src = b.string("x");
        let other = b.declare("other", other_src);
        let f = b.function(Some("h"), vec![], vec![], vec![decl, other]);
        let tree = b.finish(vec![f]);
        let names = request_bound_names(&tree, f);
        assert!(names.contains("id"));
        assert!(!names.contains("other"));
    }
}
