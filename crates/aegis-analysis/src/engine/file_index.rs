//! Per-file index built once before traversal.
//!
//! Rules that need file-level context (global middleware registration,
//! imports) query this instead of rescanning the tree from every visit.

use crate::patterns::KeywordSet;
use crate::tree::{NodeId, NodeKind, SourceTree};

/// Callee names that install middleware or plugins for a whole app.
const GLOBAL_REGISTRATION: &[&str] = &[
    "use",
    "register",
    "add_middleware",
    "init_app",
    "useGlobalGuards",
    "useGlobalPipes",
    "wrap_app",
];

#[derive(Debug, Default)]
pub struct FileIndex {
    /// Every `Call`/`New` with a resolvable callee path.
    pub calls: Vec<(NodeId, String)>,
    /// Import sources, including `require("x")`.
    pub imports: Vec<String>,
    pub decorators: Vec<(NodeId, String)>,
}

impl FileIndex {
    pub fn build(tree: &SourceTree) -> Self {
        let mut index = Self::default();
        for (id, node) in tree.nodes() {
            match node.kind {
                NodeKind::Call | NodeKind::New => {
                    let Some(path) = tree.callee_path(id) else {
                        continue;
                    };
                    if path == "require" || path == "__import__" || path == "importlib.import_module" {
                        if let Some(src) = tree.call_args(id).next().and_then(|a| tree.string_value(a)) {
                            index.imports.push(src.to_string());
                        }
                    }
                    index.calls.push((id, path));
                }
                NodeKind::Import => {
                    if let Some(src) = node.text() {
                        index.imports.push(src.to_string());
                    }
                }
                NodeKind::Decorator => {
                    if let Some(name) = node.text() {
                        index.decorators.push((id, name.to_string()));
                    }
                }
                _ => {}
            }
        }
        index
    }

    pub fn imports_any(&self, keywords: &KeywordSet) -> bool {
        self.imports.iter().any(|i| keywords.matches(i))
    }

    pub fn calls_any(&self, keywords: &KeywordSet) -> bool {
        self.calls.iter().any(|(_, p)| keywords.matches(p))
    }

    /// Whether the file installs something matching `keywords` for the whole
    /// app: `app.use(limiter)`, `app.use(requireAuth)`, `Limiter(app, ...)`,
    /// `limiter.init_app(app)`, `ThrottlerModule.forRoot(...)`.
    pub fn registers_globally(&self, tree: &SourceTree, keywords: &KeywordSet) -> bool {
        self.calls.iter().any(|(call, path)| {
            let last = path.rsplit('.').next().unwrap_or(path);
            let mentions = |id: NodeId| {
                tree.descendants(id).any(|d| match tree.kind(d) {
                    NodeKind::Identifier | NodeKind::Member | NodeKind::Property => {
                        tree.text(d).is_some_and(|t| keywords.matches(t))
                    }
                    NodeKind::Call | NodeKind::New => {
                        tree.callee_path(d).is_some_and(|p| keywords.matches(&p))
                    }
                    _ => false,
                })
            };
            if GLOBAL_REGISTRATION.contains(&last) && path.contains('.') {
                return tree.call_args(*call).any(mentions)
                    || (last == "init_app" && keywords.matches(path));
            }
            if keywords.matches(path) {
                return path.ends_with("forRoot")
                    || tree.call_args(*call).any(|a| {
                        tree.text(a).is_some_and(|t| t == "app" || t == "default_limits")
                    });
            }
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{keywords, KeywordSet};
    use crate::tree::TreeBuilder;

    #[test]
    fn test_global_limiter_registration() {
        let mut b = TreeBuilder::new();
        let limiter = b.ident("apiLimiter");
        let use_call = b.call_path("app.use", vec![limiter]);
        let tree = b.finish(vec![use_call]);
        let index = FileIndex::build(&tree);
        let set = KeywordSet::new(keywords::RATE_LIMIT);
        assert!(index.registers_globally(&tree, &set));
    }

    #[test]
    fn test_flask_limiter_constructor() {
        let mut b = TreeBuilder::new();
        let app = b.ident("app");
        let call = b.call_path("Limiter", vec![app]);
        let decl = b.declare("limiter", call);
        let tree = b.finish(vec![decl]);
        let index = FileIndex::build(&tree);
        let set = KeywordSet::new(keywords::RATE_LIMIT);
        assert!(index.registers_globally(&tree, &set));
    }

    #[test]
    fn test_require_counts_as_import() {
        let mut b = TreeBuilder::new();
        let src = b.string("express-rate-limit");
        let call = b.call_path("require", vec![src]);
        let tree = b.finish(vec![call]);
        let index = FileIndex::build(&tree);
        assert_eq!(index.imports, vec!["express-rate-limit".to_string()]);
        assert!(index.imports_any(&KeywordSet::new(keywords::RATE_LIMIT)));
    }
}
