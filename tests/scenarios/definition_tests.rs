//! Definition and hover through a loaded workspace

use lsp_types::{Position, Range};

use elm_intel::TextChange;

use super::{offline_config, open};
use crate::common::TestRepo;

const STRINGS: &str = "module Utils.Strings exposing (shout)

{-| Make it loud -}
shout : String -> String
shout s =
    s ++ \"!\"
";

const MAIN_WITH_ALIAS: &str = "module Main exposing (main)

import Utils.Strings as S

main =
    S.shout \"hi\"
";

const TYPES: &str = "module Types exposing (Msg(..), Model)

type Msg
    = Increment
    | Decrement

type alias Model =
    { count : Int }
";

const UPDATE: &str = "module Main exposing (update)

import Types exposing (Msg(..), Model)

update : Msg -> Model -> Model
update msg model =
    case msg of
        Increment ->
            { model | count = model.count + 1 }

        Decrement ->
            model
";

#[tokio::test]
async fn test_body_reference_resolves_to_sibling_declaration() {
    let repo = TestRepo::application();
    repo.add_module("A", "module A exposing (foo)\nfoo = bar\nbar = 1");
    let (workspace, _publications) = open(&repo, offline_config());

    let location = workspace
        .definition(&repo.uri("src/A.elm"), Position::new(1, 6))
        .expect("bar should resolve");
    assert_eq!(location.uri, repo.uri("src/A.elm"));
    assert_eq!(location.range, Range::new(Position::new(2, 0), Position::new(2, 7)));
}

#[tokio::test]
async fn test_aliased_qualified_reference() {
    let repo = TestRepo::application();
    repo.add_module("Utils.Strings", STRINGS);
    repo.add_module("Main", MAIN_WITH_ALIAS);
    let (workspace, _publications) = open(&repo, offline_config());
    let main = repo.uri("src/Main.elm");

    let shout = workspace.definition(&main, Position::new(5, 7)).unwrap();
    assert_eq!(shout.uri, repo.uri("src/Utils/Strings.elm"));
    assert_eq!(shout.range.start, Position::new(4, 0));

    let module = workspace.definition(&main, Position::new(5, 4)).unwrap();
    assert_eq!(module.uri, repo.uri("src/Utils/Strings.elm"));
    assert_eq!(module.range.start, Position::new(0, 0));
}

#[tokio::test]
async fn test_hover_shows_annotation_and_doc_comment() {
    let repo = TestRepo::application();
    repo.add_module("Utils.Strings", STRINGS);
    repo.add_module("Main", MAIN_WITH_ALIAS);
    let (workspace, _publications) = open(&repo, offline_config());

    let hint = workspace
        .hover(&repo.uri("src/Main.elm"), Position::new(5, 7))
        .unwrap();
    assert!(hint.contains("```elm\nshout : String -> String\n```"));
    assert!(hint.ends_with("Make it loud"));
}

#[tokio::test]
async fn test_types_constructors_and_arguments() {
    let repo = TestRepo::application();
    repo.add_module("Types", TYPES);
    repo.add_module("Main", UPDATE);
    let (workspace, _publications) = open(&repo, offline_config());
    let main = repo.uri("src/Main.elm");
    let types = repo.uri("src/Types.elm");

    let msg = workspace.definition(&main, Position::new(4, 9)).unwrap();
    assert_eq!((msg.uri.as_str(), msg.range.start), (types.as_str(), Position::new(2, 0)));

    let increment = workspace.definition(&main, Position::new(7, 8)).unwrap();
    assert_eq!(increment.uri, types);
    assert_eq!(increment.range.start, Position::new(3, 6));

    let model = workspace.definition(&main, Position::new(11, 12)).unwrap();
    assert_eq!(model.uri, main);
    assert_eq!(model.range, Range::new(Position::new(5, 11), Position::new(5, 16)));
}

#[tokio::test]
async fn test_edits_and_deletes_change_resolution() {
    let repo = TestRepo::application();
    repo.add_module("Types", TYPES);
    repo.add_module("Main", UPDATE);
    let (workspace, _publications) = open(&repo, offline_config());
    let main = repo.uri("src/Main.elm");
    let types = repo.uri("src/Types.elm");

    // Rename the argument; the body reference now falls through to nothing
    let rename = TextChange::ranged(Range::new(Position::new(5, 11), Position::new(5, 16)), "m");
    workspace.change_document(&main, [rename], 2).unwrap();
    assert!(workspace.definition(&main, Position::new(11, 12)).is_none());

    workspace.delete_document(&types);
    assert!(workspace.definition(&main, Position::new(4, 9)).is_none());
    assert!(workspace.snapshot().get(&types).is_none());
}

#[tokio::test]
async fn test_package_sources_are_loaded() {
    let repo = TestRepo::package();
    repo.add_module("Pkg", "module Pkg exposing (value)\n\nvalue = 1\n");
    repo.add_file("tests/PkgTest.elm", "module PkgTest exposing (..)\n\nimport Pkg\n");
    let (workspace, _publications) = open(&repo, offline_config());

    let snapshot = workspace.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.modules().contains("Pkg"));
}

#[tokio::test]
async fn test_unrelated_positions_have_no_definition() {
    let repo = TestRepo::application();
    repo.add_module("A", "module A exposing (foo)\n\nfoo =\n    \"text\"\n");
    let (workspace, _publications) = open(&repo, offline_config());
    let a = repo.uri("src/A.elm");

    assert!(workspace.definition(&a, Position::new(3, 6)).is_none());
    assert!(workspace.definition(&a, Position::new(40, 0)).is_none());
    assert!(workspace.definition(&repo.uri("src/Missing.elm"), Position::new(0, 0)).is_none());
}
