//! Reporters: output formats for a finished scan.
//!
//! Three formats: human-readable text, JSON, and SARIF 2.1.0.

pub mod json;
pub mod sarif;
pub mod text;

use crate::engine::ScanResult;
use crate::rules::RuleRegistry;

/// Trait for report generation.
pub trait Reporter: Send + Sync {
    fn name(&self) -> &'static str;
    fn generate(&self, result: &ScanResult) -> Result<String, String>;
}

/// Create a reporter by format name. `registry` supplies rule descriptions
/// for formats that carry them.
pub fn create_reporter(format: &str, registry: &RuleRegistry, use_color: bool) -> Option<Box<dyn Reporter>> {
    match format {
        "text" => Some(Box::new(text::TextReporter::new(use_color))),
        "json" => Some(Box::new(json::JsonReporter)),
        "sarif" => Some(Box::new(sarif::SarifReporter::new(registry))),
        _ => None,
    }
}

/// List all available reporter format names.
pub fn available_formats() -> &'static [&'static str] {
    &["text", "json", "sarif"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_format_has_a_reporter() {
        let registry = RuleRegistry::builtin();
        for format in available_formats() {
            let reporter = create_reporter(format, &registry, false).unwrap();
            assert_eq!(reporter.name(), *format);
        }
        assert!(create_reporter("junit", &registry, false).is_none());
    }
}
