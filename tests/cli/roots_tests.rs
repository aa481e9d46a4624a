//! Tests for the roots command

use crate::common::*;

#[test]
fn test_roots_lists_every_manifest() {
    let repo = TestRepo::new();
    repo.add_file("app/elm.json", test_repo::APPLICATION_MANIFEST);
    repo.add_file("lib/elm.json", test_repo::PACKAGE_MANIFEST);
    repo.add_file("app/elm-stuff/0.19.1/elm.json", test_repo::APPLICATION_MANIFEST);
    repo.add_file("node_modules/tool/elm.json", test_repo::APPLICATION_MANIFEST);

    let output = repo.run_cli_success(&["roots"]);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2, "unexpected output:\n{}", output);
    assert!(lines[0].ends_with("app"));
    assert!(lines[1].ends_with("lib"));
}

#[test]
fn test_roots_json_reports_source_directories() {
    let repo = TestRepo::application();
    let output = repo.run_cli_success(&["--format", "json", "roots"]);
    let json = assert_valid_json(&output, "roots");
    let roots = json.as_array().unwrap();
    assert_eq!(roots.len(), 1);
    let dirs = roots[0]["source_directories"].as_array().unwrap();
    assert!(dirs[0].as_str().unwrap().ends_with("src"));
}

#[test]
fn test_roots_marks_broken_manifest() {
    let repo = TestRepo::new();
    repo.add_file("broken/elm.json", "{ not json");
    let output = repo.run_cli_success(&["roots"]);
    assert!(output.contains("Invalid elm.json"), "unexpected output:\n{}", output);
}

#[test]
fn test_roots_without_projects() {
    let repo = TestRepo::new();
    let output = repo.run_cli_success(&["roots"]);
    assert_eq!(output, "No elm.json found\n");
}
