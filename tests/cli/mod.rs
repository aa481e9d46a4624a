//! CLI command integration tests
//!
//! Each test builds an Elm project in a temp directory and runs the
//! compiled `elm-intel` binary inside it, checking text and JSON output.

pub mod diagnostics_tests;
pub mod lookup_tests;
pub mod modules_tests;
pub mod roots_tests;
