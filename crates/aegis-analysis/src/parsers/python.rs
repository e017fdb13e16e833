//! Python normalizer.

use super::normalizer::{field_text, node_text, operator_text, unquote, Child, LanguageNormalizer, Mapping};
use crate::tree::{Node, NodeId, NodeKind};

pub struct PythonNormalizer;

impl PythonNormalizer {
    /// Children whose text is already the parent's `text`.
    fn is_carried(child: &Child<'_>) -> bool {
        let parent = child.parent_kind;
        match child.field {
            Some("name") => matches!(
                parent,
                "function_definition"
                    | "class_definition"
                    | "keyword_argument"
                    | "default_parameter"
                    | "typed_default_parameter"
            ),
            Some("attribute") => parent == "attribute",
            Some("key") => parent == "pair",
            Some("module_name") => parent == "import_from_statement",
            Some("return_type") | Some("type_parameters") => true,
            _ => parent == "typed_parameter" && child.node.kind() == "identifier",
        }
    }

    fn has_interpolation(node: tree_sitter::Node<'_>) -> bool {
        let mut cursor = node.walk();
        let found = node.named_children(&mut cursor).any(|c| c.kind() == "interpolation");
        found
    }

    /// Static text of an f-string up to its first interpolation.
    fn fstring_head(node: tree_sitter::Node<'_>, source: &[u8]) -> String {
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        let start = children
            .iter()
            .find(|c| c.kind() == "string_start")
            .map_or(node.start_byte(), |c| c.end_byte());
        let end = children
            .iter()
            .find(|c| c.kind() == "interpolation")
            .map_or(node.end_byte(), |c| c.start_byte());
        source
            .get(start..end)
            .and_then(|b| std::str::from_utf8(b).ok())
            .unwrap_or_default()
            .to_string()
    }

    fn concatenated(node: tree_sitter::Node<'_>, source: &[u8]) -> String {
        let mut cursor = node.walk();
        let joined = node
            .named_children(&mut cursor)
            .map(|part| unquote(node_text(part, source)))
            .collect();
        joined
    }

    fn first_identifier(node: tree_sitter::Node<'_>, source: &[u8]) -> Option<String> {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "identifier")
            .map(|c| node_text(c, source).to_string());
        found
    }
}

impl LanguageNormalizer for PythonNormalizer {
    fn map(&self, child: Child<'_>, source: &[u8]) -> Mapping {
        use Mapping::*;

        let node = child.node;
        let kind = node.kind();
        let text = || Some(node_text(node, source).to_string());

        if Self::is_carried(&child) {
            return Drop;
        }

        if matches!(child.parent_kind, "parameters" | "lambda_parameters") {
            match kind {
                "identifier" => return Leaf(NodeKind::Parameter, text()),
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    let name = node_text(node, source).trim_start_matches('*').to_string();
                    return Leaf(NodeKind::Parameter, Some(name));
                }
                _ => {}
            }
        }

        match kind {
            "comment" => Leaf(NodeKind::Comment, text()),
            "string_start" | "string_content" | "string_end" | "escape_sequence" | "format_specifier"
            | "type_conversion" | "keyword_separator" | "positional_separator" | "wildcard_import"
            | "future_import_statement" => Drop,

            "function_definition" => {
                Keep(NodeKind::Function, field_text(node, "name", source).map(str::to_string))
            }
            "lambda" => Keep(NodeKind::Function, None),
            "decorated_definition" => Decorated,
            "decorator" => Keep(NodeKind::Decorator, None),
            "parameters" | "lambda_parameters" | "expression_statement" | "parenthesized_expression"
            | "await" | "else_clause" | "except_clause" | "except_group_clause" | "finally_clause"
            | "interpolation" | "list_splat" | "dictionary_splat" => Flatten,
            "typed_parameter" => Keep(NodeKind::Parameter, Self::first_identifier(node, source)),
            "default_parameter" | "typed_default_parameter" => {
                Keep(NodeKind::Parameter, field_text(node, "name", source).map(str::to_string))
            }
            "type" => Leaf(NodeKind::TypeRef, text()),

            "class_definition" => {
                Keep(NodeKind::Class, field_text(node, "name", source).map(str::to_string))
            }
            "argument_list" if child.parent_kind == "class_definition" => Leaf(NodeKind::Other, text()),
            "argument_list" => Flatten,
            "block" => Keep(NodeKind::Block, None),

            "call" => Keep(NodeKind::Call, None),
            "keyword_argument" => {
                Keep(NodeKind::Property, field_text(node, "name", source).map(str::to_string))
            }
            "attribute" => {
                Keep(NodeKind::Member, field_text(node, "attribute", source).map(str::to_string))
            }
            "subscript" => Keep(NodeKind::Index, None),
            "identifier" | "dotted_name" => Leaf(NodeKind::Identifier, text()),

            "string" if Self::has_interpolation(node) => {
                Keep(NodeKind::TemplateLiteral, Some(Self::fstring_head(node, source)))
            }
            "string" => Leaf(NodeKind::StringLiteral, Some(unquote(node_text(node, source)).to_string())),
            "concatenated_string" => Leaf(NodeKind::StringLiteral, Some(Self::concatenated(node, source))),
            "integer" | "float" => Leaf(NodeKind::NumberLiteral, text()),
            "true" | "false" => Leaf(NodeKind::BoolLiteral, text()),
            "none" => Leaf(NodeKind::NullLiteral, text()),

            "dictionary" => Keep(NodeKind::ObjectLiteral, None),
            "pair" => {
                let key = node.child_by_field_name("key").map(|k| {
                    let raw = node_text(k, source);
                    let key = if k.kind() == "string" { unquote(raw) } else { raw };
                    key.to_string()
                });
                Keep(NodeKind::Property, key)
            }
            "list" | "tuple" | "set" | "pattern_list" | "tuple_pattern" | "list_pattern"
            | "expression_list" => Keep(NodeKind::ArrayLiteral, None),

            "import_statement" => {
                Keep(NodeKind::Import, field_text(node, "name", source).map(|n| {
                    n.split(" as ").next().unwrap_or(n).trim().to_string()
                }))
            }
            "import_from_statement" => {
                Keep(NodeKind::Import, field_text(node, "module_name", source).map(str::to_string))
            }
            "aliased_import" => {
                Leaf(NodeKind::Identifier, field_text(node, "name", source).map(str::to_string))
            }

            "assignment" => Keep(NodeKind::Assignment, Some("=".to_string())),
            "augmented_assignment" => {
                Keep(NodeKind::Assignment, operator_text(node, source).map(str::to_string))
            }
            "binary_operator" | "boolean_operator" | "comparison_operator" => {
                Keep(NodeKind::BinaryOp, operator_text(node, source).map(str::to_string))
            }
            "not_operator" => Keep(NodeKind::UnaryOp, Some("not".to_string())),
            "unary_operator" => Keep(NodeKind::UnaryOp, operator_text(node, source).map(str::to_string)),
            "if_statement" | "elif_clause" => Keep(NodeKind::If, None),
            "conditional_expression" => Keep(NodeKind::Conditional, None),
            "try_statement" => Keep(NodeKind::Try, None),
            "return_statement" => Keep(NodeKind::Return, None),

            _ => Keep(NodeKind::Other, None),
        }
    }

    /// `a if cond else b` puts the condition second; conditionals are
    /// normalized to condition-first.
    fn fixup(&self, ts_kind: &str, _kind: NodeKind, children: &mut Vec<NodeId>, _nodes: &[Node]) {
        if ts_kind == "conditional_expression" && children.len() >= 2 {
            children.swap(0, 1);
        }
    }
}
