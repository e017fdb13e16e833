//! Tree-sitter parsing into normalized `SourceUnit`s.
//!
//! Parsers are `thread_local!`: a `tree_sitter::Parser` is not `Sync`, and
//! each worker thread reuses its own instance across files. Trees with
//! syntax errors are still normalized (error nodes become `Other`), so one
//! bad statement does not hide the rest of the file from the rules.

pub mod javascript;
pub mod normalizer;
pub mod python;

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use aegis_core::errors::ParseError;
use rustc_hash::FxHashMap;

use self::javascript::JavaScriptNormalizer;
use self::normalizer::{normalize, LanguageNormalizer};
use self::python::PythonNormalizer;
use crate::tree::{Language, SourceUnit};

/// Concrete tree-sitter grammar. TypeScript files ending in `.tsx` need
/// the TSX grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    JavaScript,
    TypeScript,
    Tsx,
    Python,
}

impl Grammar {
    pub fn for_path(path: &str, language: Language) -> Self {
        match language {
            Language::JavaScript => Grammar::JavaScript,
            Language::Python => Grammar::Python,
            Language::TypeScript => {
                let is_tsx = Path::new(path)
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("tsx"));
                if is_tsx {
                    Grammar::Tsx
                } else {
                    Grammar::TypeScript
                }
            }
        }
    }

    fn ts_language(self) -> tree_sitter::Language {
        match self {
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Grammar::JavaScript => "javascript",
            Grammar::TypeScript => "typescript",
            Grammar::Tsx => "tsx",
            Grammar::Python => "python",
        }
    }

    fn normalizer(self) -> &'static dyn LanguageNormalizer {
        match self {
            Grammar::Python => &PythonNormalizer,
            _ => &JavaScriptNormalizer,
        }
    }
}

thread_local! {
    static PARSERS: RefCell<FxHashMap<Grammar, tree_sitter::Parser>> =
        RefCell::new(FxHashMap::default());
}

/// Parse UTF-8 bytes read from disk.
pub fn parse_bytes(path: &str, language: Language, bytes: &[u8]) -> Result<SourceUnit, ParseError> {
    let source = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8 {
        path: PathBuf::from(path),
    })?;
    parse_source(path, language, source)
}

/// Parse `source` and normalize it. `path` becomes the unit id.
pub fn parse_source(path: &str, language: Language, source: &str) -> Result<SourceUnit, ParseError> {
    let grammar = Grammar::for_path(path, language);
    let tree = PARSERS.with(|cell| -> Result<tree_sitter::Tree, ParseError> {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(grammar) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let mut parser = tree_sitter::Parser::new();
                parser
                    .set_language(&grammar.ts_language())
                    .map_err(|err| ParseError::GrammarSetup {
                        language: grammar.name().to_string(),
                        message: err.to_string(),
                    })?;
                e.insert(parser)
            }
        };
        parser.parse(source, None).ok_or_else(|| ParseError::NoTree {
            path: PathBuf::from(path),
        })
    })?;

    let root = tree.root_node();
    if root.has_error() {
        tracing::debug!(path, errors = count_errors(root), "syntax errors, normalizing partial tree");
    }
    let normalized = normalize(grammar.normalizer(), root, source.as_bytes());
    Ok(SourceUnit::new(path, language, normalized))
}

/// Number of ERROR and MISSING nodes in a tree.
pub fn count_errors(root: tree_sitter::Node<'_>) -> usize {
    let mut count = 0;
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            count += 1;
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return count;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeKind, SourceTree};

    fn find(tree: &SourceTree, kind: NodeKind, text: &str) -> Option<crate::tree::NodeId> {
        tree.descendants(tree.root())
            .find(|id| tree.kind(*id) == kind && tree.text(*id) == Some(text))
    }

    #[test]
    fn test_js_call_and_member() {
        let unit = parse_source("a.js", Language::JavaScript, "fetch(\"http://example.com\");\n").unwrap();
        let tree = &unit.tree;
        let call = tree
            .descendants(tree.root())
            .find(|id| tree.kind(*id) == NodeKind::Call)
            .unwrap();
        assert_eq!(tree.callee_path(call).as_deref(), Some("fetch"));
        let arg = tree.call_args(call).next().unwrap();
        assert_eq!(tree.string_value(arg), Some("http://example.com"));
        assert_eq!(tree.span(call).start_line, 1);
        assert_eq!(tree.span(call).start_column, 1);
    }

    #[test]
    fn test_js_function_shape() {
        let src = "// @public\nasync function getUser(req, res) { return res.json(req.user); }\n";
        let unit = parse_source("a.js", Language::JavaScript, src).unwrap();
        let tree = &unit.tree;
        let f = find(tree, NodeKind::Function, "getUser").unwrap();
        let kinds: Vec<_> = tree.children(f).iter().map(|c| tree.kind(*c)).collect();
        assert_eq!(kinds, vec![NodeKind::Parameter, NodeKind::Parameter, NodeKind::Block]);
        assert!(find(tree, NodeKind::Comment, "// @public").is_some());
    }

    #[test]
    fn test_ts_typed_parameter_and_decorator() {
        let src = "class C {\n  @Post('/users')\n  create(@Body() dto: CreateUserDto) { return dto; }\n}\n";
        let unit = parse_source("c.ts", Language::TypeScript, src).unwrap();
        let tree = &unit.tree;
        let f = find(tree, NodeKind::Function, "create").unwrap();
        let param = tree.first_child_of_kind(f, NodeKind::Parameter).unwrap();
        assert_eq!(tree.text(param), Some("dto"));
        let ty = tree.first_child_of_kind(param, NodeKind::TypeRef).unwrap();
        assert_eq!(tree.text(ty), Some("CreateUserDto"));
        let deco = tree.first_child_of_kind(f, NodeKind::Decorator).unwrap();
        assert_eq!(tree.text(deco), Some("Post"));
        assert_eq!(tree.kind(tree.children(deco)[0]), NodeKind::Call);
    }

    #[test]
    fn test_js_object_and_declarator() {
        let src = "const token = jwt.sign(payload, key, { expiresIn: 999999 });\n";
        let unit = parse_source("t.ts", Language::TypeScript, src).unwrap();
        let tree = &unit.tree;
        let decl = find(tree, NodeKind::VariableDeclarator, "token").unwrap();
        let call = tree.binding_value(decl).unwrap();
        assert_eq!(tree.callee_path(call).as_deref(), Some("jwt.sign"));
        let options = tree.call_args(call).nth(2).unwrap();
        let prop = tree.property(options, "expiresIn").unwrap();
        let value = tree.property_value(prop).unwrap();
        assert_eq!(tree.text(value), Some("999999"));
    }

    #[test]
    fn test_js_template_and_import() {
        let src = "import axios from 'axios';\nconst u = `http://${host}/api`;\n";
        let unit = parse_source("x.mjs", Language::JavaScript, src).unwrap();
        let tree = &unit.tree;
        assert!(find(tree, NodeKind::Import, "axios").is_some());
        let tpl = tree
            .descendants(tree.root())
            .find(|id| tree.kind(*id) == NodeKind::TemplateLiteral)
            .unwrap();
        assert_eq!(tree.text(tpl), Some("http://"));
        assert_eq!(tree.children(tpl).len(), 1);
    }

    #[test]
    fn test_python_decorated_function() {
        let src = "@app.route('/users')\n@login_required\ndef users(request: HttpRequest):\n    return request.GET\n";
        let unit = parse_source("v.py", Language::Python, src).unwrap();
        let tree = &unit.tree;
        let f = find(tree, NodeKind::Function, "users").unwrap();
        let kinds: Vec<_> = tree.children(f).iter().map(|c| tree.kind(*c)).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Parameter, NodeKind::Decorator, NodeKind::Decorator, NodeKind::Block]
        );
        let decos: Vec<_> = tree
            .children(f)
            .iter()
            .filter(|c| tree.kind(**c) == NodeKind::Decorator)
            .filter_map(|c| tree.text(*c))
            .collect();
        assert_eq!(decos, vec!["app.route", "login_required"]);
        let param = tree.child(f, 0).unwrap();
        assert_eq!(tree.text(param), Some("request"));
        assert!(tree.first_child_of_kind(param, NodeKind::TypeRef).is_some());
    }

    #[test]
    fn test_python_keyword_arguments() {
        let src = "requests.get(url, verify=False)\n";
        let unit = parse_source("r.py", Language::Python, src).unwrap();
        let tree = &unit.tree;
        let prop = find(tree, NodeKind::Property, "verify").unwrap();
        let value = tree.property_value(prop).unwrap();
        assert_eq!(tree.kind(value), NodeKind::BoolLiteral);
        assert_eq!(tree.text(value), Some("False"));
    }

    #[test]
    fn test_python_fstring_and_comment() {
        let src = "# aegis-ignore no-insecure-transport\nurl = f\"http://{host}/x\"\n";
        let unit = parse_source("f.py", Language::Python, src).unwrap();
        let tree = &unit.tree;
        assert!(find(tree, NodeKind::Comment, "# aegis-ignore no-insecure-transport").is_some());
        assert!(find(tree, NodeKind::TemplateLiteral, "http://").is_some());
        let assign = tree
            .descendants(tree.root())
            .find(|id| tree.kind(*id) == NodeKind::Assignment)
            .unwrap();
        assert_eq!(tree.binding_name(assign), Some("url"));
        assert_eq!(tree.span(assign).start_line, 2);
    }

    #[test]
    fn test_syntax_errors_are_tolerated() {
        let src = "function ok() { return 1; }\nconst = ;\nfetch('http://x.io');\n";
        let unit = parse_source("bad.js", Language::JavaScript, src).unwrap();
        let tree = &unit.tree;
        assert!(find(tree, NodeKind::Function, "ok").is_some());
    }

    #[test]
    fn test_invalid_utf8() {
        let err = parse_bytes("bin.js", Language::JavaScript, &[0x66, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidUtf8 { .. }));
    }

    #[test]
    fn test_grammar_for_path() {
        assert_eq!(Grammar::for_path("a/b.tsx", Language::TypeScript), Grammar::Tsx);
        assert_eq!(Grammar::for_path("a/b.ts", Language::TypeScript), Grammar::TypeScript);
        assert_eq!(Grammar::for_path("a/b.jsx", Language::JavaScript), Grammar::JavaScript);
    }
}
