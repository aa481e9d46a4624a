//! Per-root coordination
//!
//! A [`Workspace`] owns everything belonging to one `elm.json` root: its
//! configuration, syntax forest, sequence counter and the three diagnostic
//! channels. Document lifecycle events update the forest and trigger the
//! channels; definition and hover are read-only snapshot queries.
//!
//! [`Workspaces`] holds one workspace per discovered root and routes a uri
//! to the workspace with the longest matching root.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ignore::WalkBuilder;
use lsp_types::Position;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::definition::{DefinitionLocation, DefinitionService};
use crate::diagnostics::{aggregator, AggregatorHandle, CompilerChannel, LinterChannel, Publication, SyntaxChannel};
use crate::document::{apply_changes, path_from_uri, uri_from_path, TextChange};
use crate::error::{EngineError, Result};
use crate::forest::{Forest, Snapshot};

/// Project manifest file name
pub const MANIFEST_FILE: &str = "elm.json";

/// Directories never searched for roots or sources
const SKIPPED_DIRS: &[&str] = &["elm-stuff", "node_modules"];

// ============================================================================
// Manifest
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Application,
    Package,
}

/// The parts of `elm.json` the engine reads
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(rename = "type")]
    pub kind: ProjectKind,

    #[serde(rename = "source-directories", default)]
    pub source_directories: Vec<PathBuf>,
}

impl Manifest {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(EngineError::NoProjectRoot {
                path: root.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(&path).map_err(|e| EngineError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| EngineError::Manifest {
            path,
            message: e.to_string(),
        })
    }

    /// Source directories, absolute; packages always use `src`
    pub fn source_dirs(&self, root: &Path) -> Vec<PathBuf> {
        match self.kind {
            ProjectKind::Package => vec![root.join("src")],
            ProjectKind::Application => self
                .source_directories
                .iter()
                .map(|dir| normalize(&root.join(dir)))
                .collect(),
        }
    }

    /// Every `.elm` file under the source directories, sorted
    pub fn source_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .source_dirs(root)
            .iter()
            .filter(|dir| dir.is_dir())
            .flat_map(|dir| walk(dir))
            .filter(|path| path.extension().is_some_and(|ext| ext == "elm"))
            .collect();
        files.sort();
        files.dedup();
        files
    }
}

/// Drop `.` segments and fold `..` into its parent without touching the disk
///
/// Editors address files by their plain path, so `root/./src` and
/// `root/lib/../src` must produce the same uris as `root/src`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normal = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normal.components().next_back() {
                Some(Component::Normal(_)) => {
                    normal.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normal.push(".."),
            },
            other => normal.push(other.as_os_str()),
        }
    }
    normal
}

fn walk(dir: &Path) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(dir);
    builder.follow_links(false);
    builder.filter_entry(|entry| {
        !SKIPPED_DIRS
            .iter()
            .any(|skipped| entry.file_name() == *skipped)
    });
    builder
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Every directory under `path` holding an `elm.json`, sorted
pub fn discover_roots(path: &Path) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = walk(path)
        .into_iter()
        .filter(|file| file.file_name().is_some_and(|name| name == MANIFEST_FILE))
        .filter_map(|file| file.parent().map(Path::to_path_buf))
        .collect();
    roots.sort();
    roots
}

/// The nearest ancestor of `path` holding an `elm.json`
pub fn find_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
}

// ============================================================================
// Workspace
// ============================================================================

/// One project root
pub struct Workspace {
    root: PathBuf,
    manifest: Manifest,
    config: EngineConfig,
    forest: Forest,
    sequence: AtomicU64,
    /// Serializes read-modify-write edits
    edits: Mutex<()>,
    definitions: DefinitionService,
    aggregator: AggregatorHandle,
    syntax: SyntaxChannel,
    compiler: Option<CompilerChannel>,
    linter: Option<LinterChannel>,
}

impl Workspace {
    /// Open `root` with the configuration found there
    pub fn open(root: &Path, aggregator: AggregatorHandle) -> Result<Self> {
        let config = EngineConfig::load(root)?;
        Self::with_config(root, config, aggregator)
    }

    pub fn with_config(root: &Path, config: EngineConfig, aggregator: AggregatorHandle) -> Result<Self> {
        let manifest = Manifest::load(root)?;
        let qualified_access = config.resolver.qualified_access;

        let compiler = if config.compiler.enabled {
            match config.compiler_program() {
                Some(program) => Some(CompilerChannel::new(
                    root,
                    program,
                    Duration::from_millis(config.compiler.debounce_ms),
                    aggregator.clone(),
                )),
                None => {
                    warn!(root = %root.display(), "elm not found, compiler diagnostics disabled");
                    None
                }
            }
        } else {
            None
        };

        let linter = if config.linter.enabled {
            match config.linter_program() {
                Some(program) => Some(LinterChannel::new(
                    root,
                    program,
                    config.linter.args.clone(),
                    config.linter.stdin,
                    aggregator.clone(),
                )),
                None => {
                    info!(command = %config.linter.command, "linter not found, linter diagnostics disabled");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            root: root.to_path_buf(),
            manifest,
            forest: Forest::new()?,
            sequence: AtomicU64::new(0),
            edits: Mutex::new(()),
            definitions: DefinitionService::new(qualified_access),
            syntax: SyntaxChannel::new(aggregator.clone(), qualified_access),
            aggregator,
            compiler,
            linter,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Snapshot {
        self.forest.snapshot()
    }

    pub fn has_compiler(&self) -> bool {
        self.compiler.is_some()
    }

    pub fn has_linter(&self) -> bool {
        self.linter.is_some()
    }

    /// Parse every source file of the root; returns the number loaded
    pub fn load(&self) -> usize {
        let files = self.manifest.source_files(&self.root);
        let loaded = self.forest.load_files(&files);
        info!(root = %self.root.display(), loaded, "loaded source files");
        loaded
    }

    /// Whether `uri` lies inside this root
    pub fn contains(&self, uri: &str) -> bool {
        path_from_uri(uri).is_some_and(|path| path.starts_with(&self.root))
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn open_document(&self, uri: &str, text: String, version: i32) -> Result<()> {
        if let Some(linter) = &self.linter {
            linter.update_text(uri, &text);
        }
        self.forest.set(uri, text, version)?;
        self.trigger(uri);
        Ok(())
    }

    /// Apply edits to the current text of `uri`
    ///
    /// Takes engine [`TextChange`]s or the editor's
    /// `TextDocumentContentChangeEvent`s as they arrive.
    pub fn change_document<C>(&self, uri: &str, changes: impl IntoIterator<Item = C>, version: i32) -> Result<()>
    where
        C: Into<TextChange>,
    {
        let changes: Vec<TextChange> = changes.into_iter().map(Into::into).collect();
        let _edit = self.edits.lock();
        let current = self
            .forest
            .get(uri)
            .map(|file| file.text().to_string())
            .unwrap_or_default();
        let text = apply_changes(&current, &changes);
        if let Some(linter) = &self.linter {
            // The linter's copy follows the same edits from its own base
            let base = linter.text_of(uri).unwrap_or_else(|| current.clone());
            linter.update_text(uri, &apply_changes(&base, &changes));
        }
        self.forest.set(uri, text, version)?;
        self.trigger(uri);
        Ok(())
    }

    /// A save with optional full text; without text the forest entry stays
    pub fn save_document(&self, uri: &str, text: Option<String>) -> Result<()> {
        if let Some(text) = text {
            let version = self.forest.get(uri).map(|f| f.version).unwrap_or(0);
            if let Some(linter) = &self.linter {
                linter.update_text(uri, &text);
            }
            self.forest.set(uri, text, version)?;
        }
        self.trigger(uri);
        Ok(())
    }

    /// Stop tracking the editor's copy
    ///
    /// A file still on disk is reloaded so other modules keep resolving
    /// against it; otherwise it leaves the forest.
    pub fn close_document(&self, uri: &str) -> Result<()> {
        if let Some(linter) = &self.linter {
            linter.forget_text(uri);
        }
        match path_from_uri(uri).filter(|path| path.is_file()) {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|e| EngineError::io(&path, e))?;
                self.forest.reload(uri, text, 0)?;
                let sequence = self.next_sequence();
                self.syntax.run(sequence, &self.forest.snapshot(), uri);
            }
            None => self.delete_document(uri),
        }
        Ok(())
    }

    /// The file is gone: drop it and recheck its importers
    pub fn delete_document(&self, uri: &str) {
        let module = self.forest.get(uri).map(|file| file.module.name.clone());
        if let Some(linter) = &self.linter {
            linter.forget_text(uri);
        }
        if let Some(compiler) = &self.compiler {
            compiler.forget(uri);
        }
        if !self.forest.remove(uri) {
            return;
        }
        // Runs already sequenced can no longer bring the file back
        let sequence = self.next_sequence();
        self.aggregator.forget(uri, sequence);
        debug!(uri, sequence, "removed from forest");

        let Some(module) = module else {
            return;
        };
        let snapshot = self.forest.snapshot();
        let importers: Vec<String> = snapshot
            .importers_of(&module)
            .into_iter()
            .map(str::to_string)
            .collect();
        for importer in importers {
            let sequence = self.next_sequence();
            self.syntax.run(sequence, &snapshot, &importer);
        }
    }

    /// Run all three channels for `uri`
    ///
    /// The syntax channel runs inline; the compiler and linter are spawned
    /// on the current tokio runtime.
    pub fn trigger(&self, uri: &str) -> u64 {
        let sequence = self.next_sequence();
        self.syntax.run(sequence, &self.forest.snapshot(), uri);
        if let Some(compiler) = &self.compiler {
            match path_from_uri(uri) {
                Some(path) => compiler.trigger(sequence, path),
                None => debug!(uri, "not a file uri, skipping compiler"),
            }
        }
        if let Some(linter) = &self.linter {
            linter.trigger(sequence, uri);
        }
        sequence
    }

    pub fn definition(&self, uri: &str, position: Position) -> Option<DefinitionLocation> {
        self.definitions
            .definition(&self.forest.snapshot(), uri, position)
    }

    pub fn hover(&self, uri: &str, position: Position) -> Option<String> {
        self.definitions.hover(&self.forest.snapshot(), uri, position)
    }

    /// Run every channel over the whole root and wait for the results
    pub async fn diagnose_all(&self) -> Publication {
        let sequence = self.next_sequence();
        let snapshot = self.forest.snapshot();
        self.syntax.run_all(sequence, &snapshot);

        if let Some(compiler) = &self.compiler {
            let files: Vec<PathBuf> = snapshot.uris().into_iter().filter_map(path_from_uri).collect();
            if !files.is_empty() {
                compiler.run(sequence, files).await;
            }
        }
        if let Some(linter) = &self.linter {
            if self.config.linter.stdin {
                for uri in snapshot.uris() {
                    linter.run(sequence, Some(uri)).await;
                }
            } else {
                linter.run(sequence, None).await;
            }
        }
        self.aggregator.current().await
    }
}

// ============================================================================
// Workspaces
// ============================================================================

/// Every root of an editor session
#[derive(Default)]
pub struct Workspaces {
    /// Longest root first
    workspaces: Vec<Arc<Workspace>>,
}

impl Workspaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and load every root found under `path`
    ///
    /// Each root gets its own aggregator publishing into `publish`, so one
    /// root's table never carries another's files. Client `settings` are
    /// merged over every root's configuration. A root that fails to open
    /// is skipped with a warning. Must be called inside a tokio runtime.
    pub fn discover(
        path: &Path,
        settings: Option<&serde_json::Value>,
        publish: &mpsc::UnboundedSender<Publication>,
    ) -> Self {
        let mut workspaces = Self::new();
        for root in discover_roots(path) {
            let opened = EngineConfig::load(&root).and_then(|mut config| {
                if let Some(settings) = settings {
                    config.merge_client_settings(settings)?;
                }
                let (aggregator, _task) = aggregator::spawn(publish.clone());
                Workspace::with_config(&root, config, aggregator)
            });
            match opened {
                Ok(workspace) => {
                    workspace.load();
                    workspaces.insert(workspace);
                }
                Err(e) => warn!(root = %root.display(), error = %e, "skipping root"),
            }
        }
        workspaces
    }

    pub fn insert(&mut self, workspace: Workspace) -> Arc<Workspace> {
        let workspace = Arc::new(workspace);
        self.workspaces.push(Arc::clone(&workspace));
        self.workspaces
            .sort_by_key(|w| std::cmp::Reverse(w.root().as_os_str().len()));
        workspace
    }

    /// The workspace owning `uri`
    pub fn for_uri(&self, uri: &str) -> Option<&Arc<Workspace>> {
        self.workspaces.iter().find(|w| w.contains(uri))
    }

    pub fn for_path(&self, path: &Path) -> Option<&Arc<Workspace>> {
        self.for_uri(&uri_from_path(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Workspace>> {
        self.workspaces.iter()
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }
}
