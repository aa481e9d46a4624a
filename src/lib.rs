//! elm-intel: definition lookup and merged diagnostics for Elm projects
//!
//! The engine keeps one [`Workspace`] per `elm.json` root. A workspace holds
//! a syntax forest (every source file parsed with tree-sitter-elm and
//! lowered into an arena tree), resolves references across modules against
//! forest snapshots, and merges diagnostics from three independent channels:
//! the compiler (`elm make`), a linter (`elm-review` by default) and a live
//! syntax check.
//!
//! # Example
//!
//! ```ignore
//! use elm_intel::{diagnostics::aggregator, Workspace};
//! use lsp_types::Position;
//!
//! let (publish_tx, mut publications) = tokio::sync::mpsc::unbounded_channel();
//! let (handle, _task) = aggregator::spawn(publish_tx);
//! let workspace = Workspace::open(root, handle)?;
//! workspace.load();
//!
//! let location = workspace.definition(&uri, Position::new(4, 10));
//! let publication = publications.recv().await;
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod definition;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod forest;
pub mod hint;
pub mod module_table;
pub mod protocol;
pub mod resolve;
pub mod syntax;
pub mod workspace;

// Re-export commonly used types
pub use cli::{Cli, OutputFormat};
pub use config::{ClientSettings, EngineConfig};
pub use definition::{DefinitionLocation, DefinitionService};
pub use diagnostics::{Channel, Diagnostic, Publication, Severity};
pub use document::{LineIndex, TextChange};
pub use error::{EngineError, Result};
pub use forest::{Forest, Snapshot, SourceFile};
pub use module_table::{ModuleRecord, ModuleTable};
pub use resolve::{QualifiedAccess, Resolution, Resolver, Unresolved};
pub use workspace::{discover_roots, Manifest, Workspace, Workspaces};
