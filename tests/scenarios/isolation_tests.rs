//! Lifecycle edges: source directory spelling, late channel results, and
//! roots sharing one editor session

use std::collections::BTreeSet;
use std::sync::Arc;

use lsp_types::{Position, Range};
use tokio::sync::mpsc;

use elm_intel::diagnostics::{aggregator, Channel, ChannelReport, Diagnostic, Severity};
use elm_intel::{Workspace, Workspaces};

use super::offline_config;
use crate::common::*;

const OFFLINE_TOML: &str = "[compiler]\nenabled = false\n\n[linter]\nenabled = false\n";

fn application(source_dirs: &str) -> String {
    format!(
        r#"{{
    "type": "application",
    "source-directories": {},
    "elm-version": "0.19.1",
    "dependencies": {{"direct": {{}}, "indirect": {{}}}},
    "test-dependencies": {{"direct": {{}}, "indirect": {{}}}}
}}"#,
        source_dirs
    )
}

const MAIN: &str = "module Main exposing (main)\n\nimport Util exposing (helper)\n\nmain =\n    helper 1\n";
const UTIL: &str = "module Util exposing (helper)\n\nhelper n =\n    n\n";

#[tokio::test]
async fn test_dot_and_parent_source_dirs_match_editor_uris() {
    let repo = TestRepo::new();
    repo.add_file("app/elm.json", &application(r#"[".", "../shared"]"#));
    repo.add_file("app/Main.elm", MAIN);
    repo.add_file("shared/Util.elm", UTIL);

    let (publish_tx, mut publications) = mpsc::unbounded_channel();
    let (handle, _task) = aggregator::spawn(publish_tx);
    let workspace = Workspace::with_config(&repo.file_path("app"), offline_config(), handle).unwrap();
    assert_eq!(workspace.load(), 2);

    let main = repo.uri("app/Main.elm");
    let util = repo.uri("shared/Util.elm");
    workspace.open_document(&main, MAIN.to_string(), 1).unwrap();
    let publication = publications.recv().await.unwrap();
    assert_eq!(publication.get(&main).map(|d| d.len()), Some(0));

    workspace.open_document(&util, UTIL.to_string(), 1).unwrap();
    let publication = publications.recv().await.unwrap();
    assert_eq!(publication.get(&util).map(|d| d.len()), Some(0));
    assert_eq!(workspace.snapshot().len(), 2);

    let location = workspace.definition(&main, Position::new(5, 5)).unwrap();
    assert_eq!(location.uri, util);
}

#[tokio::test]
async fn test_results_started_before_delete_do_not_restore_the_file() {
    let repo = TestRepo::application();
    repo.add_module("Main", MAIN);
    repo.add_module("Util", UTIL);

    let (publish_tx, mut publications) = mpsc::unbounded_channel();
    let (handle, _task) = aggregator::spawn(publish_tx);
    let workspace = Workspace::with_config(repo.path(), offline_config(), handle.clone()).unwrap();
    workspace.load();
    let util = repo.uri("src/Util.elm");

    let sequence = workspace.trigger(&util);
    publications.recv().await.unwrap();

    workspace.delete_document(&util);
    let cleared = loop {
        let publication = publications.recv().await.unwrap();
        if !publication.cleared.is_empty() {
            break publication;
        }
    };
    assert_eq!(cleared.cleared, vec![util.clone()]);

    // A compile that was already running when the file went away
    let late = Diagnostic::new(
        Channel::Compiler,
        Range::new(Position::new(2, 0), Position::new(2, 6)),
        Severity::Error,
        "TYPE MISMATCH - stale",
    );
    handle.report(ChannelReport::new(Channel::Compiler, sequence).with_file(util.as_str(), vec![late]));

    let current = handle.current().await;
    assert!(current.get(&util).is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_slow_project_lint_does_not_flag_files_a_newer_run_found_clean() {
    let repo = TestRepo::application();
    repo.add_module("Main", "module Main exposing (main)\n\nmain =\n    1\n");
    repo.add_file(
        "old.json",
        r#"{"type":"review-errors","errors":[{"path":"src/Main.elm","errors":[{"rule":"NoUnused","message":"old finding","region":{"start":{"line":3,"column":1},"end":{"line":3,"column":5}}}]}]}"#,
    );
    repo.add_file("slow", "");
    // The first run is slow and flags Main; every later run is clean
    let linter = write_script(
        repo.path(),
        "fake-review",
        "if [ -f slow ]; then rm slow; touch started; sleep 1; cat old.json; fi",
    );
    repo.add_file(
        ".elm-intel.toml",
        &format!("[compiler]\nenabled = false\n\n[linter]\ncommand = \"{}\"\n", linter.display()),
    );

    let (publish_tx, _publications) = mpsc::unbounded_channel();
    let (handle, _task) = aggregator::spawn(publish_tx);
    let workspace = Arc::new(Workspace::open(repo.path(), handle).unwrap());
    workspace.load();
    assert!(workspace.has_linter());

    let older = Arc::clone(&workspace);
    let slow = tokio::spawn(async move { older.diagnose_all().await });
    for _ in 0..200 {
        if repo.file_path("started").exists() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(repo.file_path("started").exists());

    let main = repo.uri("src/Main.elm");
    let newer = workspace.diagnose_all().await;
    assert_eq!(newer.get(&main).map(|d| d.len()), Some(0));

    let after_slow = slow.await.unwrap();
    assert_eq!(
        after_slow.get(&main).map(|d| d.len()),
        Some(0),
        "late findings: {:?}",
        after_slow.get(&main)
    );
}

#[tokio::test]
async fn test_sibling_roots_publish_separate_tables() {
    let repo = TestRepo::new();
    for root in ["one", "two"] {
        repo.add_file(&format!("{}/elm.json", root), &application(r#"["src"]"#));
        repo.add_file(&format!("{}/.elm-intel.toml", root), OFFLINE_TOML);
        repo.add_file(
            &format!("{}/src/Main.elm", root),
            "module Main exposing (main)\n\nmain =\n    missing\n",
        );
    }

    let (publish_tx, mut publications) = mpsc::unbounded_channel();
    let workspaces = Workspaces::discover(repo.path(), None, &publish_tx);
    assert_eq!(workspaces.len(), 2);

    for root in ["one", "two"] {
        let uri = repo.uri(&format!("{}/src/Main.elm", root));
        workspaces.for_uri(&uri).unwrap().trigger(&uri);
    }

    for _ in 0..2 {
        let publication = publications.recv().await.unwrap();
        let owners: BTreeSet<_> = publication
            .files
            .iter()
            .map(|file| workspaces.for_uri(&file.uri).unwrap().root().to_path_buf())
            .collect();
        assert_eq!(owners.len(), 1, "one table mixes roots: {:?}", publication.files);
    }
}
