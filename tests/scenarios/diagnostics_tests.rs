//! Merged diagnostics from all three channels

use lsp_types::{Position, Range};

use elm_intel::diagnostics::{aggregator, Channel, ChannelReport, Diagnostic, Severity};
use elm_intel::protocol::to_publish_params;
use elm_intel::EngineConfig;

use super::{offline_config, open};
use crate::common::*;

const MAIN: &str = "module Main exposing (main)

main =
    missing
";

const COMPILE_REPORT: &str = r#"{
    "type": "compile-errors",
    "errors": [{
        "path": "src/Main.elm",
        "name": "Main",
        "problems": [{
            "title": "NAMING ERROR",
            "region": {"start": {"line": 4, "column": 5}, "end": {"line": 4, "column": 12}},
            "message": ["I cannot find a `", {"bold": false, "underline": false, "color": "RED", "string": "missing"}, "` variable."]
        }]
    }]
}"#;

const REVIEW_REPORT: &str = r#"{
    "type": "review-errors",
    "errors": [{
        "path": "src/Main.elm",
        "errors": [{
            "rule": "NoMissingTypeAnnotation",
            "message": "Missing type annotation for `main`",
            "region": {"start": {"line": 3, "column": 1}, "end": {"line": 3, "column": 5}}
        }]
    }]
}"#;

fn diag(channel: Channel, line: u32) -> Diagnostic {
    Diagnostic::new(
        channel,
        Range::new(Position::new(line, 0), Position::new(line, 3)),
        Severity::Error,
        format!("{:?} finding", channel),
    )
}

#[tokio::test]
async fn test_channel_reports_accumulate_for_one_file() {
    let (publish_tx, mut publications) = tokio::sync::mpsc::unbounded_channel();
    let (handle, _task) = aggregator::spawn(publish_tx);
    let b = "file:///project/src/B.elm";

    handle.report(ChannelReport::new(Channel::Linter, 1).with_file(b, vec![diag(Channel::Linter, 0)]));
    assert_eq!(publications.recv().await.unwrap().get(b).unwrap().len(), 1);

    handle.report(ChannelReport::new(Channel::Compiler, 1).with_file(b, vec![diag(Channel::Compiler, 1)]));
    handle.report(ChannelReport::new(Channel::Syntax, 1).with_file(b, vec![diag(Channel::Syntax, 2)]));
    publications.recv().await.unwrap();
    let all = publications.recv().await.unwrap();
    assert_eq!(all.get(b).unwrap().len(), 3);
}

#[tokio::test]
async fn test_syntax_channel_alone() {
    let repo = TestRepo::application();
    repo.add_module("Main", MAIN);
    let (workspace, _publications) = open(&repo, offline_config());

    let publication = workspace.diagnose_all().await;
    let diagnostics = publication.get(&repo.uri("src/Main.elm")).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "Cannot find `missing`");
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(diagnostics[0].range, Range::new(Position::new(3, 4), Position::new(3, 11)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_all_channels_merge_in_order() {
    let repo = TestRepo::application();
    repo.add_module("Main", MAIN);
    let mut config = EngineConfig::default();
    config.compiler.path = Some(fake_compiler(repo.path(), COMPILE_REPORT));
    config.linter.command = fake_linter(repo.path(), REVIEW_REPORT).to_string_lossy().to_string();
    let (workspace, _publications) = open(&repo, config);
    assert!(workspace.has_compiler() && workspace.has_linter());

    let publication = workspace.diagnose_all().await;
    let diagnostics = publication.get(&repo.uri("src/Main.elm")).unwrap();
    let sources: Vec<&str> = diagnostics.iter().map(|d| d.source.as_str()).collect();
    assert_eq!(sources, vec!["elm-review", "elm-intel", "Elm"]);

    let compiler = &diagnostics[2];
    assert_eq!(compiler.message, "NAMING ERROR - I cannot find a `missing` variable.");
    assert_eq!(compiler.range, Range::new(Position::new(3, 4), Position::new(3, 11)));
    assert_eq!(
        diagnostics[0].message,
        "NoMissingTypeAnnotation: Missing type annotation for `main`"
    );

    let params = to_publish_params(&publication).unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].diagnostics.len(), 3);
}

#[cfg(unix)]
#[tokio::test]
async fn test_broken_tools_do_not_block_other_channels() {
    let repo = TestRepo::application();
    repo.add_module("Main", MAIN);
    let mut config = EngineConfig::default();
    config.compiler.path = Some(write_script(repo.path(), "broken-elm", "echo 'elm: crashed'\nexit 2"));
    config.linter.command = write_script(repo.path(), "broken-review", "exit 3")
        .to_string_lossy()
        .to_string();
    let (workspace, _publications) = open(&repo, config);

    let publication = workspace.diagnose_all().await;
    let diagnostics = publication.get(&repo.uri("src/Main.elm")).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].source, "elm-intel");
}

#[cfg(unix)]
#[tokio::test]
async fn test_fixing_the_file_clears_compiler_findings() {
    let repo = TestRepo::application();
    repo.add_module("Main", MAIN);
    let mut config = EngineConfig::default();
    config.compiler.path = Some(fake_compiler(repo.path(), COMPILE_REPORT));
    config.linter.enabled = false;
    let (workspace, _publications) = open(&repo, config);
    let main = repo.uri("src/Main.elm");

    let before = workspace.diagnose_all().await;
    assert_eq!(before.get(&main).unwrap().len(), 2);

    std::fs::write(repo.path().join("compiler-report.json"), "").unwrap();
    let fixed = "module Main exposing (main)\n\nmain =\n    1\n";
    repo.add_module("Main", fixed);
    workspace.open_document(&main, fixed.to_string(), 1).unwrap();

    let after = workspace.diagnose_all().await;
    assert!(after.get(&main).unwrap().is_empty());
}
