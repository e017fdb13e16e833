//! JSON reporter: the `ScanResult` as-is.

use super::Reporter;
use crate::engine::ScanResult;

pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn generate(&self, result: &ScanResult) -> Result<String, String> {
        serde_json::to_string_pretty(result).map_err(|e| format!("JSON serialization failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Diagnostic;
    use aegis_core::types::Severity;

    #[test]
    fn test_json_uses_camel_case_and_parses_back() {
        let d = Diagnostic::internal("internal/io-error", "ioError", "a.js", Severity::Warning, "unreadable");
        let result = ScanResult::from_diagnostics(vec![d]);
        let out = JsonReporter.generate(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["diagnostics"][0]["ruleId"], "internal/io-error");
        assert_eq!(value["counts"]["warning"], 1);
        assert_eq!(value["hasErrors"], false);

        let back: ScanResult = serde_json::from_str(&out).unwrap();
        assert_eq!(back, result);
    }
}
