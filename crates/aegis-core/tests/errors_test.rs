//! Tests for the Aegis error handling system.

use std::collections::HashSet;
use std::path::PathBuf;

use aegis_core::errors::*;

#[test]
fn test_all_errors_have_error_code() {
    let errors: Vec<Box<dyn Fn() -> &'static str>> = vec![
        Box::new(|| ConfigError::UnknownRule { rule_id: "x".into() }.error_code()),
        Box::new(|| ParseError::NoTree { path: PathBuf::from("a.js") }.error_code()),
        Box::new(|| {
            ScanError::MaxFileSizeExceeded {
                path: PathBuf::from("big.js"),
                size: 2,
                max: 1,
            }
            .error_code()
        }),
        Box::new(|| RuleError::Timeout { timeout_ms: 5 }.error_code()),
        Box::new(|| PipelineError::WorkerPool("boom".into()).error_code()),
    ];
    for code in errors {
        assert!(!code().is_empty());
    }
}

#[test]
fn test_from_conversions() {
    let pipeline: PipelineError = ConfigError::UnknownRule {
        rule_id: "does-not-exist".into(),
    }
    .into();
    assert!(matches!(pipeline, PipelineError::Config(ConfigError::UnknownRule { .. })));
    assert!(pipeline.is_fatal());

    let pipeline: PipelineError = ParseError::InvalidTree {
        path: PathBuf::from("a.js"),
        message: "child id 99 out of range".into(),
    }
    .into();
    assert!(matches!(pipeline, PipelineError::Parse(_)));
    assert!(!pipeline.is_fatal());
    assert_eq!(pipeline.error_code(), error_code::INVALID_TREE);

    let pipeline: PipelineError = ScanError::IoError {
        path: PathBuf::from("gone.js"),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
    }
    .into();
    assert!(!pipeline.is_fatal());
}

#[test]
fn test_codes_propagate_through_pipeline_error() {
    let pipeline: PipelineError = ConfigError::UnknownRule {
        rule_id: "does-not-exist".into(),
    }
    .into();
    assert_eq!(pipeline.error_code(), error_code::UNKNOWN_RULE);
    assert!(pipeline.coded_string().starts_with("[UNKNOWN_RULE]"));
    assert!(pipeline.to_string().contains("does-not-exist"));
}

#[test]
fn test_error_codes_are_distinct_per_kind() {
    let codes: HashSet<&str> = [
        ConfigError::InvalidGlob {
            pattern: "[".into(),
            message: "unclosed".into(),
        }
        .error_code(),
        ParseError::InvalidTree {
            path: PathBuf::new(),
            message: "cycle".into(),
        }
        .error_code(),
        ParseError::NoTree { path: PathBuf::new() }.error_code(),
        ScanError::MaxFileSizeExceeded {
            path: PathBuf::new(),
            size: 2,
            max: 1,
        }
        .error_code(),
        RuleError::Timeout { timeout_ms: 1 }.error_code(),
        RuleError::Panicked {
            rule_id: "r".into(),
            message: "m".into(),
        }
        .error_code(),
    ]
    .into_iter()
    .collect();
    assert_eq!(codes.len(), 6);
}
