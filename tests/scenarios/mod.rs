//! Workspace scenarios: cross-module resolution and merged diagnostics

pub mod definition_tests;
pub mod diagnostics_tests;
pub mod isolation_tests;

use tokio::sync::mpsc;

use elm_intel::diagnostics::aggregator;
use elm_intel::{EngineConfig, Publication, Workspace};

use crate::common::TestRepo;

/// Compiler and linter disabled
pub fn offline_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.compiler.enabled = false;
    config.linter.enabled = false;
    config
}

/// A loaded workspace over `repo`; must run inside a tokio runtime
pub fn open(repo: &TestRepo, config: EngineConfig) -> (Workspace, mpsc::UnboundedReceiver<Publication>) {
    let (publish_tx, publications) = mpsc::unbounded_channel();
    let (handle, _task) = aggregator::spawn(publish_tx);
    let workspace = Workspace::with_config(repo.path(), config, handle).expect("Failed to open workspace");
    workspace.load();
    (workspace, publications)
}
