//! Runs the `aegis` binary against temporary projects.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn aegis(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aegis"))
        .args(args)
        .env_remove("AEGIS_LOG")
        .env_remove("AEGIS_FAIL_ON")
        .env_remove("AEGIS_THREADS")
        .output()
        .unwrap()
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (relative, content) in files {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_clean_project_exits_zero() {
    let dir = project(&[("src/app.js", "const total = add(1, 2);\n")]);
    let out = aegis(&["scan", path_str(dir.path()), "--no-color"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("in 1 files"));
}

#[test]
fn test_error_finding_exits_one() {
    let dir = project(&[(
        "src/users.js",
        "function getUserHandler(req, res) {\n  return db.users.find(req.params.id);\n}\n",
    )]);
    let out = aegis(&["scan", path_str(dir.path()), "--format", "json"]);
    assert_eq!(out.status.code(), Some(1));
    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["hasErrors"], true);
    assert!(result["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d["messageId"] == "missingAuthCheck"));
}

#[test]
fn test_fail_on_warning_flag() {
    let dir = project(&[("src/client.js", "fetch(\"http://example.com\");\n")]);
    let lenient = aegis(&["scan", path_str(dir.path())]);
    assert_eq!(lenient.status.code(), Some(0));

    let strict = aegis(&["scan", path_str(dir.path()), "--fail-on", "warning"]);
    assert_eq!(strict.status.code(), Some(1));
}

#[test]
fn test_unknown_rule_in_config_exits_two() {
    let dir = project(&[
        ("src/app.js", "fetch(\"http://example.com\");\n"),
        ("aegis.toml", "[rules.does-not-exist]\nenabled = false\n"),
    ]);
    let out = aegis(&["scan", path_str(dir.path())]);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("does-not-exist"));
}

#[test]
fn test_missing_target_exits_two() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let out = aegis(&["scan", path_str(&missing)]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_explicit_json_config() {
    let dir = project(&[("src/client.js", "fetch(\"http://example.com\");\n")]);
    let config = dir.path().join("aegis.json");
    fs::write(&config, r#"{ "failOn": "warning", "rules": { "no-insecure-transport": { "enabled": false } } }"#)
        .unwrap();
    let out = aegis(&["scan", path_str(dir.path()), "--config", path_str(&config), "--format", "sarif"]);

    let sarif: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let results = sarif["runs"][0]["results"].as_array().unwrap();
    assert!(results.iter().all(|r| r["ruleId"] != "no-insecure-transport"));
}

#[test]
fn test_rules_listing() {
    let out = aegis(&["rules"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.lines().count(), 10);
    assert!(stdout.lines().any(|l| l.starts_with("no-weak-crypto")));

    let out = aegis(&["rules", "--json"]);
    let rules: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(rules.as_array().unwrap().len(), 10);
}
