//! Inline suppression system: `aegis-ignore` comments.
//!
//! Directives are read from `Comment` nodes, so suppression works on any
//! tree, including ones that arrive without source text.

use aegis_core::constants::SUPPRESSION_MARKER;

use crate::tree::{NodeKind, SourceTree};

/// A parsed suppression directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionDirective {
    /// First line of the comment.
    pub line: u32,
    /// Last line covered: the line after the comment ends.
    pub applies_to_line: u32,
    /// Rule ids to suppress; empty means every rule.
    pub rule_ids: Vec<String>,
}

impl SuppressionDirective {
    pub fn covers(&self, line: u32, rule_id: &str) -> bool {
        (self.line..=self.applies_to_line).contains(&line)
            && (self.rule_ids.is_empty() || self.rule_ids.iter().any(|r| r == rule_id))
    }
}

/// Checks whether diagnostics are suppressed via inline comments.
///
/// Supports:
/// - `// aegis-ignore`: suppress all rules on this and the next line
/// - `# aegis-ignore no-weak-crypto`: suppress a specific rule
/// - `/* aegis-ignore no-weak-crypto, no-insecure-transport */`: several
/// - `// aegis-ignore no-weak-crypto -- legacy checksum`: trailing reason
#[derive(Debug, Clone, Default)]
pub struct SuppressionChecker {
    directives: Vec<SuppressionDirective>,
}

impl SuppressionChecker {
    /// Collect directives from every comment in the tree.
    pub fn from_tree(tree: &SourceTree) -> Self {
        let directives = tree
            .nodes()
            .filter(|(_, node)| node.kind == NodeKind::Comment)
            .filter_map(|(_, node)| {
                let text = node.text()?;
                parse_directive(node.span.start_line, node.span.end_line, text)
            })
            .collect();
        Self { directives }
    }

    /// Check if a diagnostic of `rule_id` on `line` is suppressed.
    pub fn is_suppressed(&self, line: u32, rule_id: &str) -> bool {
        line != 0 && self.directives.iter().any(|d| d.covers(line, rule_id))
    }
}

/// Parse one comment for an `aegis-ignore` directive.
fn parse_directive(start_line: u32, end_line: u32, text: &str) -> Option<SuppressionDirective> {
    let trimmed = text.trim();
    let pos = trimmed.find(SUPPRESSION_MARKER)?;

    // The marker must open the comment body, not sit inside prose.
    let before = trimmed[..pos].trim_start_matches(['/', '*', '#', '-', '<', '!']).trim();
    if !before.is_empty() {
        return None;
    }

    let mut after = trimmed[pos + SUPPRESSION_MARKER.len()..].trim();
    if let Some(rest) = after.strip_suffix("*/").or_else(|| after.strip_suffix("-->")) {
        after = rest.trim();
    }
    if let Some((rules, _reason)) = after.split_once("--") {
        after = rules.trim();
    }

    let rule_ids = after
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();

    Some(SuppressionDirective {
        line: start_line,
        applies_to_line: end_line + 1,
        rule_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeBuilder;

    #[test]
    fn test_parse_forms() {
        let all = parse_directive(3, 3, "// aegis-ignore").unwrap();
        assert!(all.rule_ids.is_empty());
        assert_eq!(all.applies_to_line, 4);

        let one = parse_directive(1, 1, "# aegis-ignore no-weak-crypto").unwrap();
        assert_eq!(one.rule_ids, vec!["no-weak-crypto"]);

        let many =
            parse_directive(1, 1, "/* aegis-ignore no-weak-crypto, no-insecure-transport */").unwrap();
        assert_eq!(many.rule_ids, vec!["no-weak-crypto", "no-insecure-transport"]);

        let reason = parse_directive(1, 1, "// aegis-ignore no-weak-crypto -- legacy").unwrap();
        assert_eq!(reason.rule_ids, vec!["no-weak-crypto"]);

        assert!(parse_directive(1, 1, "// do not add aegis-ignore here").is_none());
        assert!(parse_directive(1, 1, "// regular comment").is_none());
    }

    #[test]
    fn test_same_and_next_line() {
        let mut b = TreeBuilder::new();
        b.line(4);
        let comment = b.comment("// aegis-ignore no-insecure-transport");
        let tree = b.finish(vec![comment]);
        let checker = SuppressionChecker::from_tree(&tree);

        assert!(checker.is_suppressed(4, "no-insecure-transport"));
        assert!(checker.is_suppressed(5, "no-insecure-transport"));
        assert!(!checker.is_suppressed(6, "no-insecure-transport"));
        assert!(!checker.is_suppressed(5, "no-weak-crypto"));
    }
}
