//! Text reporter: one line per diagnostic plus a summary.

use aegis_core::types::Severity;

use super::Reporter;
use crate::engine::{Diagnostic, ScanResult};

/// Human-readable terminal output.
pub struct TextReporter {
    pub use_color: bool,
}

impl TextReporter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn color_start(&self, severity: Severity) -> &'static str {
        if !self.use_color {
            return "";
        }
        match severity {
            Severity::Error => "\x1b[31m",   // red
            Severity::Warning => "\x1b[33m", // yellow
            Severity::Info => "\x1b[36m",    // cyan
        }
    }

    fn color_end(&self) -> &'static str {
        if self.use_color {
            "\x1b[0m"
        } else {
            ""
        }
    }

    fn location(d: &Diagnostic) -> String {
        let unit = if d.unit.is_empty() { "<project>" } else { d.unit.as_str() };
        if d.span.is_synthetic() {
            unit.to_string()
        } else {
            format!("{unit}:{}:{}", d.span.start_line, d.span.start_column)
        }
    }
}

impl Default for TextReporter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Reporter for TextReporter {
    fn name(&self) -> &'static str {
        "text"
    }

    fn generate(&self, result: &ScanResult) -> Result<String, String> {
        let mut output = String::new();

        for d in &result.diagnostics {
            output.push_str(&format!(
                "{}: {}{}{} [{}] {}\n",
                Self::location(d),
                self.color_start(d.severity),
                d.severity,
                self.color_end(),
                d.rule_id,
                d.message,
            ));
            if let Some(fix) = &d.fix {
                output.push_str(&format!("    fix: {fix}\n"));
            }
        }
        if !result.diagnostics.is_empty() {
            output.push('\n');
        }

        let counts = result.counts;
        output.push_str(&format!(
            "{} problems ({} errors, {} warnings, {} info) in {} files",
            counts.total(),
            counts.error,
            counts.warning,
            counts.info,
            result.files_scanned,
        ));
        if result.files_skipped > 0 {
            output.push_str(&format!(", {} skipped", result.files_skipped));
        }
        output.push_str(&format!(" [{} ms]\n", result.duration_ms));

        for (category, count) in &result.by_category {
            output.push_str(&format!("  {category}: {count}\n"));
        }

        if result.cancelled {
            output.push_str("Scan cancelled: results are partial.\n");
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Span;

    fn diagnostic(unit: &str, span: Span, severity: Severity) -> Diagnostic {
        let mut d = Diagnostic::internal("no-insecure-transport", "httpDetected", unit, severity, "Use HTTPS.");
        d.category = "transport".to_string();
        d.span = span;
        d
    }

    #[test]
    fn test_lines_and_summary() {
        let mut fixed = diagnostic("src/a.js", Span::new(3, 5, 3, 20), Severity::Error);
        fixed.fix = Some("https://example.com".to_string());
        let project = diagnostic("", Span::synthetic(), Severity::Warning);
        let mut result = ScanResult::from_diagnostics(vec![project, fixed]);
        result.files_scanned = 2;

        let out = TextReporter::new(false).generate(&result).unwrap();
        assert!(out.contains("<project>: warning [no-insecure-transport] Use HTTPS.\n"));
        assert!(out.contains("src/a.js:3:5: error [no-insecure-transport] Use HTTPS.\n"));
        assert!(out.contains("    fix: https://example.com\n"));
        assert!(out.contains("2 problems (1 errors, 1 warnings, 0 info) in 2 files"));
        assert!(out.contains("  transport: 2\n"));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_color_codes() {
        let result = ScanResult::from_diagnostics(vec![diagnostic("a.js", Span::new(1, 1, 1, 2), Severity::Error)]);
        let out = TextReporter::new(true).generate(&result).unwrap();
        assert!(out.contains("\x1b[31merror\x1b[0m"));
    }

    #[test]
    fn test_clean_scan() {
        let out = TextReporter::default().generate(&ScanResult::default()).unwrap();
        assert!(out.starts_with("0 problems"));
    }
}
