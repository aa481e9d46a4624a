//! Command modules for the elm-intel CLI
//!
//! Each command module implements one top-level command:
//! - `roots` - elm.json discovery
//! - `modules` - the module table of a root
//! - `lookup` - definition and hover at a position
//! - `diagnostics` - all three channels over a root
//!
//! All command handlers take their respective `Args` struct from `cli.rs`
//! and a shared `CommandContext`, and return the text to print.

pub mod diagnostics;
pub mod lookup;
pub mod modules;
pub mod roots;

pub use diagnostics::run_diagnostics;
pub use lookup::{run_definition, run_hover};
pub use modules::run_modules;
pub use roots::run_roots;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::cli::OutputFormat;
use crate::config::EngineConfig;
use crate::diagnostics::{aggregator, Publication};
use crate::error::{EngineError, Result};
use crate::workspace::{find_root, Workspace, MANIFEST_FILE};

/// Shared context passed to all command handlers
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Output format (text or json)
    pub format: OutputFormat,
    /// Show verbose output
    pub verbose: bool,
    /// Editor settings merged over every root's configuration
    pub settings: Option<serde_json::Value>,
}

impl CommandContext {
    /// Create a new CommandContext from CLI args
    pub fn from_cli(format: OutputFormat, verbose: bool) -> Self {
        Self {
            format,
            verbose,
            settings: None,
        }
    }

    /// Read the `--settings` file, if one was given
    pub fn with_settings_file(mut self, path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            self.settings = Some(EngineConfig::read_client_settings(path)?);
        }
        Ok(self)
    }
}

/// Pretty JSON with a trailing newline
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|json| json + "\n")
        .map_err(|e| EngineError::ConfigError {
            message: format!("JSON serialization failed: {}", e),
        })
}

pub(crate) fn absolute(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|_| EngineError::FileNotFound {
        path: path.display().to_string(),
    })
}

/// The root a command works on
///
/// An explicit directory holding an `elm.json` is used as is; otherwise the
/// nearest ancestor with one is used.
pub(crate) fn project_root(path: Option<&Path>) -> Result<PathBuf> {
    let start = match path {
        Some(path) => absolute(path)?,
        None => std::env::current_dir().map_err(|e| EngineError::FileNotFound {
            path: format!("current directory: {}", e),
        })?,
    };
    if start.join(MANIFEST_FILE).is_file() {
        return Ok(start);
    }
    find_root(&start).ok_or_else(|| EngineError::NoProjectRoot {
        path: start.display().to_string(),
    })
}

/// A loaded workspace plus the receiving end of its publications
///
/// Must be called inside a tokio runtime: the aggregator task is spawned
/// on it.
pub(crate) fn load_workspace(
    root: &Path,
    configure: impl FnOnce(&mut EngineConfig),
    ctx: &CommandContext,
) -> Result<(Workspace, mpsc::UnboundedReceiver<Publication>)> {
    let mut config = EngineConfig::load(root)?;
    if let Some(settings) = &ctx.settings {
        config.merge_client_settings(settings)?;
    }
    configure(&mut config);

    let (publish_tx, publications) = mpsc::unbounded_channel();
    let (handle, _task) = aggregator::spawn(publish_tx);
    let workspace = Workspace::with_config(root, config, handle)?;
    let loaded = workspace.load();
    if ctx.verbose {
        eprintln!("Loaded {} files from {}", loaded, root.display());
    }
    Ok((workspace, publications))
}

/// Only the syntax channel: for queries that never need external tools
pub(crate) fn offline(config: &mut EngineConfig) {
    config.compiler.enabled = false;
    config.linter.enabled = false;
}
