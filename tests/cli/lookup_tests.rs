//! Tests for the definition and hover commands

use crate::common::*;

fn project() -> TestRepo {
    let repo = TestRepo::application();
    repo.add_module(
        "Main",
        "module Main exposing (main)\n\nimport Helpers exposing (double)\n\nmain =\n    double 21\n",
    );
    repo.add_module(
        "Helpers",
        "module Helpers exposing (double)\n\n{-| Twice the input -}\ndouble : Int -> Int\ndouble n =\n    n * 2\n",
    );
    repo
}

#[test]
fn test_definition_text() {
    let repo = project();
    let output = repo.run_cli_success(&["definition", "src/Main.elm", "--line", "5", "--character", "6"]);
    assert!(
        output.trim_end().ends_with("src/Helpers.elm:4:0-5:9"),
        "unexpected output:\n{}",
        output
    );
}

#[test]
fn test_definition_json() {
    let repo = project();
    let output = repo.run_cli_success(&[
        "--format", "json", "definition", "src/Main.elm", "--line", "5", "--character", "6",
    ]);
    let json = assert_valid_json(&output, "definition");
    assert!(json["uri"].as_str().unwrap().ends_with("/src/Helpers.elm"));
    assert_eq!(json["range"]["start"]["line"], 4);
    assert_eq!(json["range"]["end"]["character"], 9);
    assert!(json["path"].as_str().unwrap().ends_with("Helpers.elm"));
}

#[test]
fn test_definition_not_found() {
    let repo = project();
    let output = repo.run_cli_success(&["definition", "src/Main.elm", "-l", "0", "-c", "0"]);
    assert_eq!(output, "No definition found\n");

    let json = repo.run_cli_success(&["-f", "json", "definition", "src/Main.elm", "-l", "5", "-c", "11"]);
    assert_eq!(json.trim(), "null");
}

#[test]
fn test_definition_of_missing_file_fails() {
    let repo = project();
    let (code, stderr) = repo.run_cli_failure(&["definition", "src/Nope.elm", "-l", "0", "-c", "0"]);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("Nope.elm"));
}

#[test]
fn test_hover() {
    let repo = project();
    let output = repo.run_cli_success(&["hover", "src/Main.elm", "--line", "5", "--character", "6"]);
    assert!(output.contains("double : Int -> Int"), "unexpected output:\n{}", output);
    assert!(output.contains("Twice the input"));

    let json = repo.run_cli_success(&["--format", "json", "hover", "src/Main.elm", "-l", "4", "-c", "0"]);
    let json = assert_valid_json(&json, "hover");
    assert!(json["contents"].is_null());
}

#[test]
fn test_hover_json_is_markdown() {
    let repo = project();
    let output = repo.run_cli_success(&["--format", "json", "hover", "src/Main.elm", "-l", "5", "-c", "6"]);
    let json = assert_valid_json(&output, "hover");
    assert_eq!(json["contents"]["kind"], "markdown");
    assert!(json["contents"]["value"].as_str().unwrap().contains("double : Int -> Int"));
}
