//! JavaScript / TypeScript / TSX normalizer.
//!
//! One mapping serves all three grammars; the TypeScript grammars only add
//! type syntax, which is either reduced to `TypeRef` leaves or dropped.

use super::normalizer::{field_text, node_text, operator_text, unquote, Child, LanguageNormalizer, Mapping};
use crate::tree::NodeKind;

pub struct JavaScriptNormalizer;

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "function",
    "generator_function_declaration",
    "generator_function",
    "arrow_function",
    "method_definition",
];

const CLASS_KINDS: &[&str] = &["class_declaration", "class", "abstract_class_declaration"];

/// Declarations that carry no runtime behavior.
const TYPE_ONLY: &[&str] = &[
    "interface_declaration",
    "type_alias_declaration",
    "ambient_declaration",
    "function_signature",
    "method_signature",
    "abstract_method_signature",
    "property_signature",
    "index_signature",
    "accessibility_modifier",
    "override_modifier",
    "type_parameters",
];

impl JavaScriptNormalizer {
    /// Children whose text is already the parent's `text`.
    fn is_carried(child: &Child<'_>) -> bool {
        let parent = child.parent_kind;
        match child.field {
            Some("name") => {
                FUNCTION_KINDS.contains(&parent)
                    || CLASS_KINDS.contains(&parent)
                    || parent == "public_field_definition"
                    || parent == "import_specifier"
                    || parent == "export_specifier"
            }
            Some("property") => parent == "member_expression" || parent == "field_definition",
            Some("key") => parent == "pair" || parent == "pair_pattern",
            Some("source") => parent == "import_statement" || parent == "export_statement",
            Some("return_type") | Some("type_parameters") => true,
            Some("pattern") => {
                (parent == "required_parameter" || parent == "optional_parameter")
                    && matches!(child.node.kind(), "identifier" | "this")
            }
            _ => false,
        }
    }

    fn is_type_node(kind: &str) -> bool {
        kind.ends_with("_type")
            || matches!(kind, "type_identifier" | "nested_type_identifier" | "type_predicate")
    }

    fn property_key(node: tree_sitter::Node<'_>, source: &[u8]) -> Option<String> {
        let key = node.child_by_field_name("key")?;
        let raw = node_text(key, source);
        Some(match key.kind() {
            "string" => unquote(raw).to_string(),
            "computed_property_name" => raw.trim_start_matches('[').trim_end_matches(']').to_string(),
            _ => raw.to_string(),
        })
    }

    /// Static text before the first `${` of a template string.
    fn template_head(raw: &str) -> String {
        let body = raw.strip_prefix('`').unwrap_or(raw);
        let end = body.find("${").unwrap_or_else(|| body.strip_suffix('`').map_or(body.len(), str::len));
        body[..end].to_string()
    }

    fn in_parameter_list(child: &Child<'_>) -> bool {
        child.parent_kind == "formal_parameters"
            || (child.parent_kind == "arrow_function" && child.field == Some("parameter"))
    }
}

impl LanguageNormalizer for JavaScriptNormalizer {
    fn map(&self, child: Child<'_>, source: &[u8]) -> Mapping {
        use Mapping::*;

        let node = child.node;
        let kind = node.kind();
        let text = || Some(node_text(node, source).to_string());

        if Self::is_carried(&child) || TYPE_ONLY.contains(&kind) {
            return Drop;
        }
        if Self::is_type_node(kind) {
            return Drop;
        }

        if Self::in_parameter_list(&child) {
            match kind {
                "identifier" => return Leaf(NodeKind::Parameter, text()),
                "assignment_pattern" => {
                    let name = field_text(node, "left", source).map(str::to_string);
                    return Leaf(NodeKind::Parameter, name);
                }
                "rest_pattern" => {
                    let name = node_text(node, source).trim_start_matches('.').to_string();
                    return Leaf(NodeKind::Parameter, Some(name));
                }
                "object_pattern" | "array_pattern" => return Keep(NodeKind::Parameter, None),
                _ => {}
            }
        }

        match kind {
            "comment" | "html_comment" => Leaf(NodeKind::Comment, text()),
            "hash_bang_line" | "string_fragment" | "escape_sequence" | "empty_statement" => Drop,

            k if FUNCTION_KINDS.contains(&k) => {
                let name = field_text(node, "name", source).map(|n| unquote(n).to_string());
                Keep(NodeKind::Function, name)
            }
            "formal_parameters" | "arguments" | "import_clause" | "named_imports" | "export_clause"
            | "template_substitution" | "spread_element" | "await_expression"
            | "parenthesized_expression" | "expression_statement" | "lexical_declaration"
            | "variable_declaration" | "else_clause" | "catch_clause" | "finally_clause"
            | "as_expression" | "satisfies_expression" | "non_null_expression"
            | "type_assertion" => Flatten,
            "required_parameter" | "optional_parameter" => {
                let name = node
                    .child_by_field_name("pattern")
                    .filter(|p| matches!(p.kind(), "identifier" | "this"))
                    .map(|p| node_text(p, source).to_string());
                Keep(NodeKind::Parameter, name)
            }
            "type_annotation" => {
                let ty = node_text(node, source).trim_start_matches(':').trim().to_string();
                Leaf(NodeKind::TypeRef, Some(ty))
            }
            "type_arguments" => Leaf(NodeKind::TypeRef, text()),

            k if CLASS_KINDS.contains(&k) => {
                Keep(NodeKind::Class, field_text(node, "name", source).map(str::to_string))
            }
            "class_heritage" => Leaf(NodeKind::Other, text()),
            "statement_block" | "class_body" => Keep(NodeKind::Block, None),
            "field_definition" => {
                Keep(NodeKind::Property, field_text(node, "property", source).map(str::to_string))
            }
            "public_field_definition" => {
                Keep(NodeKind::Property, field_text(node, "name", source).map(str::to_string))
            }
            "decorator" => Keep(NodeKind::Decorator, None),

            "call_expression" => Keep(NodeKind::Call, None),
            "new_expression" => Keep(NodeKind::New, None),
            "member_expression" => {
                Keep(NodeKind::Member, field_text(node, "property", source).map(str::to_string))
            }
            "subscript_expression" => Keep(NodeKind::Index, None),

            "identifier" | "property_identifier" | "private_property_identifier"
            | "shorthand_property_identifier_pattern" | "statement_identifier" | "this" | "super" => {
                Leaf(NodeKind::Identifier, text())
            }
            "shorthand_property_identifier" => Leaf(NodeKind::Property, text()),
            "string" => Leaf(NodeKind::StringLiteral, Some(unquote(node_text(node, source)).to_string())),
            "template_string" => {
                Keep(NodeKind::TemplateLiteral, Some(Self::template_head(node_text(node, source))))
            }
            "number" => Leaf(NodeKind::NumberLiteral, text()),
            "true" | "false" => Leaf(NodeKind::BoolLiteral, text()),
            "null" | "undefined" => Leaf(NodeKind::NullLiteral, text()),
            "regex" => Leaf(NodeKind::Other, text()),

            "object" | "object_pattern" => Keep(NodeKind::ObjectLiteral, None),
            "pair" | "pair_pattern" => Keep(NodeKind::Property, Self::property_key(node, source)),
            "array" | "array_pattern" => Keep(NodeKind::ArrayLiteral, None),

            "import_statement" => {
                let source_text = field_text(node, "source", source).map(|s| unquote(s).to_string());
                Keep(NodeKind::Import, source_text)
            }
            "import_specifier" | "export_specifier" => {
                Leaf(NodeKind::Identifier, field_text(node, "name", source).map(str::to_string))
            }
            "namespace_import" => {
                let alias = node_text(node, source).rsplit(' ').next().unwrap_or_default().to_string();
                Leaf(NodeKind::Identifier, Some(alias))
            }
            "export_statement" => Keep(NodeKind::Export, None),

            "variable_declarator" => {
                let name = node
                    .child_by_field_name("name")
                    .filter(|n| n.kind() == "identifier")
                    .map(|n| node_text(n, source).to_string());
                Keep(NodeKind::VariableDeclarator, name)
            }
            "assignment_expression" => Keep(NodeKind::Assignment, Some("=".to_string())),
            "augmented_assignment_expression" => {
                Keep(NodeKind::Assignment, operator_text(node, source).map(str::to_string))
            }
            "binary_expression" => Keep(NodeKind::BinaryOp, operator_text(node, source).map(str::to_string)),
            "unary_expression" | "update_expression" => {
                Keep(NodeKind::UnaryOp, operator_text(node, source).map(str::to_string))
            }
            "if_statement" => Keep(NodeKind::If, None),
            "ternary_expression" => Keep(NodeKind::Conditional, None),
            "try_statement" => Keep(NodeKind::Try, None),
            "return_statement" => Keep(NodeKind::Return, None),

            _ => Keep(NodeKind::Other, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_head() {
        assert_eq!(JavaScriptNormalizer::template_head("`http://${host}/x`"), "http://");
        assert_eq!(JavaScriptNormalizer::template_head("`plain`"), "plain");
        assert_eq!(JavaScriptNormalizer::template_head("`${a}`"), "");
    }
}
