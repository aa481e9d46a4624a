//! Tests for the diagnostics command

use crate::common::*;

const BROKEN: &str = "module Main exposing (main)\n\nimport Nowhere.Thing as T\n\nmain =\n    Missing.value\n";

#[test]
fn test_syntax_only_diagnostics_text() {
    let repo = TestRepo::application();
    repo.add_module("Main", BROKEN);

    let output = repo.run_cli_success(&["diagnostics", "--no-compiler", "--no-linter"]);
    assert!(
        output.contains("src/Main.elm:6:5: warning [elm-intel] No import is named `Missing`"),
        "unexpected output:\n{}",
        output
    );
    assert!(output.ends_with("0 errors, 1 warnings in 1 files (compiler, linter not run)\n"));
}

#[test]
fn test_diagnostics_json_summary() {
    let repo = TestRepo::application();
    repo.add_module("Main", BROKEN);
    repo.add_module("Clean", "module Clean exposing (x)\n\nx = 1\n");

    let output = repo.run_cli_success(&["--format", "json", "diagnostics", "--no-compiler", "--no-linter"]);
    let json = assert_valid_json(&output, "diagnostics");
    assert_eq!(json["summary"]["warnings"], 1);
    assert_eq!(json["summary"]["files"], 1);
    assert_eq!(json["summary"]["compiler"], false);
    assert_eq!(json["files"].as_array().unwrap().len(), 2);
    let messages = messages_for(&json, &repo.uri("src/Main.elm"));
    assert_eq!(messages, vec!["No import is named `Missing`".to_string()]);
}

#[cfg(unix)]
#[test]
fn test_configured_compiler_is_used() {
    let repo = TestRepo::application();
    repo.add_module("Main", "module Main exposing (main)\n\nmain =\n    1\n");
    let report = r#"{"type":"error","path":"elm.json","title":"UNKNOWN PACKAGE","message":["No such package."]}"#;
    let compiler = fake_compiler(repo.path(), report);
    repo.add_file(
        ".elm-intel.toml",
        &format!("[compiler]\npath = \"{}\"\n\n[linter]\nenabled = false\n", compiler.display()),
    );

    let output = repo.run_cli_success(&["diagnostics"]);
    assert!(
        output.contains("elm.json:1:1: error [Elm] UNKNOWN PACKAGE - No such package."),
        "unexpected output:\n{}",
        output
    );
    let calls = std::fs::read_to_string(repo.path().join("compiler-calls.log")).unwrap();
    assert!(calls.starts_with("make "));
    assert!(calls.trim_end().ends_with("--report=json --output=/dev/null"));
}

#[test]
fn test_diagnostics_with_invalid_config_fails() {
    let repo = TestRepo::application();
    repo.add_file(".elm-intel.toml", "[compiler\nenabled = ");
    let (code, stderr) = repo.run_cli_failure(&["diagnostics"]);
    assert_eq!(code, Some(5));
    assert!(stderr.contains(".elm-intel.toml"));
}

#[test]
fn test_lsp_output_is_one_publish_params_per_line() {
    let repo = TestRepo::application();
    repo.add_module("Main", BROKEN);
    repo.add_module("Clean", "module Clean exposing (x)\n\nx = 1\n");

    let output = repo.run_cli_success(&["diagnostics", "--no-compiler", "--no-linter", "--lsp"]);
    let params: Vec<serde_json::Value> = output
        .lines()
        .map(|line| assert_valid_json(line, "publish params"))
        .collect();
    assert_eq!(params.len(), 2);

    let main = params
        .iter()
        .find(|p| p["uri"] == repo.uri("src/Main.elm").as_str())
        .expect("no params for Main");
    let diagnostic = &main["diagnostics"][0];
    assert_eq!(diagnostic["severity"], 2);
    assert_eq!(diagnostic["source"], "elm-intel");
    assert_eq!(diagnostic["range"]["start"]["line"], 5);
    assert_eq!(diagnostic["message"], "No import is named `Missing`");
}

#[cfg(unix)]
#[test]
fn test_settings_file_selects_compiler() {
    let repo = TestRepo::application();
    repo.add_module("Main", "module Main exposing (main)\n\nmain =\n    1\n");
    let report = r#"{"type":"error","path":"elm.json","title":"UNKNOWN PACKAGE","message":["No such package."]}"#;
    let compiler = fake_compiler(repo.path(), report);
    repo.add_file(".elm-intel.toml", "[linter]\nenabled = false\n");
    repo.add_file(
        "editor.json",
        &format!(r#"{{"elmLS": {{"elmPath": "{}"}}}}"#, compiler.display()),
    );

    let output = repo.run_cli_success(&["diagnostics", "--settings", "editor.json"]);
    assert!(
        output.contains("elm.json:1:1: error [Elm] UNKNOWN PACKAGE - No such package."),
        "unexpected output:\n{}",
        output
    );
}

#[test]
fn test_invalid_settings_file_fails() {
    let repo = TestRepo::application();
    repo.add_file("editor.json", "{\"elmLS\": ");
    let (code, stderr) = repo.run_cli_failure(&["--settings", "editor.json", "diagnostics", "--no-compiler"]);
    assert_eq!(code, Some(5));
    assert!(stderr.contains("editor.json"));
}
