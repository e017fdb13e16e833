//! SARIF 2.1.0 reporter.
//!
//! One run, with the registry's rules as `tool.driver.rules` and one result
//! per diagnostic. Spans are already 1-based with an exclusive end, which is
//! what SARIF regions expect.

use serde_json::{json, Value};

use aegis_core::constants::VERSION;
use aegis_core::types::Severity;

use super::Reporter;
use crate::engine::{Diagnostic, ScanResult};
use crate::rules::RuleRegistry;

const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";

struct RuleDescriptor {
    id: &'static str,
    description: &'static str,
    category: &'static str,
    level: &'static str,
}

pub struct SarifReporter {
    rules: Vec<RuleDescriptor>,
}

impl SarifReporter {
    pub fn new(registry: &RuleRegistry) -> Self {
        let rules = registry
            .iter()
            .map(|rule| {
                let meta = rule.meta();
                RuleDescriptor {
                    id: meta.id,
                    description: meta.description,
                    category: meta.category.name(),
                    level: level(meta.default_severity),
                }
            })
            .collect();
        Self { rules }
    }

    fn driver_rules(&self) -> Vec<Value> {
        self.rules
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "shortDescription": { "text": r.description },
                    "defaultConfiguration": { "level": r.level },
                    "properties": { "category": r.category }
                })
            })
            .collect()
    }

    fn result(&self, d: &Diagnostic) -> Value {
        let mut result = json!({
            "ruleId": d.rule_id,
            "level": level(d.severity),
            "message": { "text": d.message },
            "properties": {
                "messageId": d.message_id,
                "category": d.category
            }
        });
        if let Some(index) = self.rules.iter().position(|r| r.id == d.rule_id) {
            result["ruleIndex"] = json!(index);
        }
        if !d.is_whole_program() {
            let mut physical = json!({
                "artifactLocation": { "uri": d.unit, "uriBaseId": "%SRCROOT%" }
            });
            if !d.span.is_synthetic() {
                physical["region"] = json!({
                    "startLine": d.span.start_line,
                    "startColumn": d.span.start_column,
                    "endLine": d.span.end_line,
                    "endColumn": d.span.end_column
                });
            }
            result["locations"] = json!([{ "physicalLocation": physical }]);
        }
        if let Some(fix) = &d.fix {
            result["properties"]["fix"] = json!(fix);
        }
        result
    }
}

fn level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

impl Reporter for SarifReporter {
    fn name(&self) -> &'static str {
        "sarif"
    }

    fn generate(&self, result: &ScanResult) -> Result<String, String> {
        let results: Vec<Value> = result.diagnostics.iter().map(|d| self.result(d)).collect();
        let sarif = json!({
            "$schema": SARIF_SCHEMA,
            "version": "2.1.0",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "aegis",
                        "version": VERSION,
                        "informationUri": "https://github.com/aegis-scan/aegis",
                        "rules": self.driver_rules()
                    }
                },
                "results": results,
                "invocations": [{
                    "executionSuccessful": !result.cancelled
                }]
            }]
        });
        serde_json::to_string_pretty(&sarif).map_err(|e| format!("SARIF serialization failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Span;

    #[test]
    fn test_sarif_structure() {
        let registry = RuleRegistry::builtin();
        let mut located = Diagnostic::internal("no-weak-crypto", "weakHash", "src/a.js", Severity::Error, "md5");
        located.span = Span::new(2, 3, 2, 10);
        let skipped = Diagnostic::internal("internal/io-error", "ioError", "b.js", Severity::Warning, "gone");
        let project = Diagnostic::internal("require-rate-limit", "noGlobalLimit", "", Severity::Info, "none");
        let result = ScanResult::from_diagnostics(vec![project, located, skipped]);

        let out = SarifReporter::new(&registry).generate(&result).unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["version"], "2.1.0");
        let run = &v["runs"][0];
        assert_eq!(run["tool"]["driver"]["rules"].as_array().unwrap().len(), registry.len());

        let results = run["results"].as_array().unwrap();
        assert!(results[0].get("locations").is_none());
        assert_eq!(results[0]["level"], "note");

        let region = &results[1]["locations"][0]["physicalLocation"]["region"];
        assert_eq!(region["startLine"], 2);
        assert_eq!(region["endColumn"], 10);
        assert!(results[1]["ruleIndex"].is_number());

        let physical = &results[2]["locations"][0]["physicalLocation"];
        assert_eq!(physical["artifactLocation"]["uri"], "b.js");
        assert!(physical.get("region").is_none());
        assert!(results[2].get("ruleIndex").is_none());
    }
}
