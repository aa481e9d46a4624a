//! Tests for the modules command

use crate::common::*;

#[test]
fn test_modules_text() {
    let repo = TestRepo::application();
    repo.add_module("Main", "module Main exposing (main)\n\nimport Page.Home\n\nmain = Page.Home.view\n");
    repo.add_module("Page.Home", "module Page.Home exposing (view)\n\nview = 1\n");

    let output = repo.run_cli_success(&["modules", "--verbose"]);
    assert!(output.contains("Main\n"));
    assert!(output.contains("Page.Home\n"));
    assert!(output.contains("imports: Page.Home"));
    assert!(output.ends_with("2 modules, 0 duplicated\n"));
}

#[test]
fn test_modules_reports_duplicates() {
    let repo = TestRepo::application();
    repo.add_file("src/One.elm", "module Shared exposing (..)\n\nx = 1\n");
    repo.add_file("src/Two.elm", "module Shared exposing (..)\n\ny = 2\n");
    repo.add_module("Other", "module Other exposing (..)\n\nz = 3\n");

    let output = repo.run_cli_success(&["--format", "json", "modules", "--duplicates"]);
    let json = assert_valid_json(&output, "modules --duplicates");
    let modules = json.as_array().unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0]["name"], "Shared");
    assert_eq!(modules[0]["uris"].as_array().unwrap().len(), 2);
}

#[test]
fn test_modules_outside_a_project_fails() {
    let repo = TestRepo::new();
    let (code, stderr) = repo.run_cli_failure(&["modules"]);
    assert_eq!(code, Some(2));
    assert!(stderr.contains("elm.json"), "unexpected stderr:\n{}", stderr);
}
