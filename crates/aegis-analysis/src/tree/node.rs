//! Node, node kinds, spans, and language tags.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Index of a node inside its `SourceTree` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source range. Lines and columns are 1-based; the end is exclusive.
/// A span of all zeros is the synthetic span used for program-level findings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Single-position span, used for file-level diagnostics.
    pub fn point(line: u32, column: u32) -> Self {
        Self::new(line, column, line, column)
    }

    /// The file-less span attached to whole-program findings.
    pub fn synthetic() -> Self {
        Self::default()
    }

    pub fn is_synthetic(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_column)
    }
}

/// Normalized node kinds shared by every supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Program,
    Function,
    Parameter,
    Class,
    Call,
    New,
    Member,
    Index,
    Identifier,
    StringLiteral,
    TemplateLiteral,
    NumberLiteral,
    BoolLiteral,
    NullLiteral,
    ObjectLiteral,
    Property,
    ArrayLiteral,
    Import,
    Export,
    Decorator,
    Comment,
    VariableDeclarator,
    Assignment,
    BinaryOp,
    UnaryOp,
    If,
    Conditional,
    Try,
    Block,
    Return,
    TypeRef,
    Other,
}

impl NodeKind {
    /// String, template, number, boolean or null literal.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::StringLiteral
                | Self::TemplateLiteral
                | Self::NumberLiteral
                | Self::BoolLiteral
                | Self::NullLiteral
        )
    }

    /// Literal with no interpolated parts.
    pub fn is_constant(self) -> bool {
        self.is_literal() && self != Self::TemplateLiteral
    }

    pub fn is_call_like(self) -> bool {
        matches!(self, Self::Call | Self::New)
    }
}

/// Source language of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
}

impl Language {
    /// Detect language from a file extension.
    pub fn from_extension(ext: Option<&str>) -> Option<Language> {
        match ext? {
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "py" | "pyi" => Some(Language::Python),
            _ => None,
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::Python => &["py", "pyi"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::TypeScript => "TypeScript",
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
        }
    }

    /// JavaScript and TypeScript share most idioms (Express, Nest, jsonwebtoken).
    pub fn is_js_family(&self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One node of the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    #[serde(default)]
    pub children: SmallVec<[NodeId; 4]>,
    /// Kind-dependent payload: identifier name, unquoted literal value,
    /// property key, function name, import source, decorator name or operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            children: SmallVec::new(),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}
