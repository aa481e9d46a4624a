//! The syntax forest: one parsed tree per source file of a project root
//!
//! # Snapshots
//!
//! The forest is published as an immutable [`Snapshot`] behind a
//! `parking_lot::RwLock`. Readers clone the snapshot (two `Arc` bumps) and
//! then work without holding any lock. Writers parse outside the lock, then
//! swap in a new file map and module table in one step, so a reader sees
//! either the old or the new tree for a file and never a mix across files.
//!
//! ```text
//! set(uri, text) ── parse (incremental if a previous tree exists)
//!                └─ write lock ── clone map ── insert ── rebuild module table ── publish
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::document::{uri_from_path, LineIndex};
use crate::error::Result;
use crate::module_table::{ModuleRecord, ModuleTable};
use crate::syntax::{lower, ElmParser, SyntaxTree};

/// One parsed source file; immutable once built
pub struct SourceFile {
    pub uri: String,
    pub version: i32,
    pub tree: SyntaxTree,
    pub module: ModuleRecord,
    pub lines: LineIndex,
    ts_tree: tree_sitter::Tree,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("module", &self.module.name)
            .finish()
    }
}

impl SourceFile {
    /// Parse `text`, reusing `previous` incrementally when given
    pub fn build(
        parser: &mut ElmParser,
        uri: &str,
        text: String,
        version: i32,
        previous: Option<&SourceFile>,
    ) -> Result<Self> {
        let (ts_tree, outcome) = parser.parse(
            &text,
            previous.map(|p| (p.text(), &p.ts_tree)),
        )?;
        debug!(uri, version, incremental = outcome.is_incremental(), "parsed");
        let lines = LineIndex::new(&text);
        let tree = lower(&ts_tree, text);
        let module = ModuleRecord::from_tree(&tree);
        Ok(Self {
            uri: uri.to_string(),
            version,
            tree,
            module,
            lines,
            ts_tree,
        })
    }

    pub fn text(&self) -> &str {
        self.tree.source()
    }
}

/// A consistent point-in-time view of every file and the module index
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    files: Arc<HashMap<String, Arc<SourceFile>>>,
    modules: Arc<ModuleTable>,
}

impl Snapshot {
    fn new(files: HashMap<String, Arc<SourceFile>>) -> Self {
        let modules = ModuleTable::build(files.iter().map(|(uri, f)| (uri.as_str(), &f.module)));
        Self {
            files: Arc::new(files),
            modules: Arc::new(modules),
        }
    }

    pub fn get(&self, uri: &str) -> Option<&Arc<SourceFile>> {
        self.files.get(uri)
    }

    pub fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    /// File declaring `module`, if exactly one does
    pub fn file_for_module(&self, module: &str) -> Option<&Arc<SourceFile>> {
        self.modules.uri_for(module).and_then(|uri| self.files.get(uri))
    }

    /// Uris of all files, sorted
    pub fn uris(&self) -> Vec<&str> {
        let mut uris: Vec<&str> = self.files.keys().map(String::as_str).collect();
        uris.sort_unstable();
        uris
    }

    pub fn files(&self) -> impl Iterator<Item = &Arc<SourceFile>> {
        self.files.values()
    }

    /// Uris of files whose written imports name `module`, sorted
    pub fn importers_of(&self, module: &str) -> Vec<&str> {
        let mut uris: Vec<&str> = self
            .files
            .values()
            .filter(|f| f.module.written_imports().any(|i| i.module == module))
            .map(|f| f.uri.as_str())
            .collect();
        uris.sort_unstable();
        uris
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// The set of parsed trees of one root
pub struct Forest {
    parser: Mutex<ElmParser>,
    current: RwLock<Snapshot>,
}

impl Forest {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: Mutex::new(ElmParser::new()?),
            current: RwLock::new(Snapshot::default()),
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current.read().clone()
    }

    pub fn get(&self, uri: &str) -> Option<Arc<SourceFile>> {
        self.current.read().get(uri).cloned()
    }

    /// Parse and atomically replace the entry for `uri`
    ///
    /// Malformed text still yields a tree; only a grammar failure errors.
    /// An entry already holding a newer version is kept and returned.
    pub fn set(&self, uri: &str, text: String, version: i32) -> Result<Arc<SourceFile>> {
        self.store(uri, text, version, true)
    }

    /// Replace the entry for `uri` regardless of its version
    ///
    /// Used when the editor gives the file back to the disk.
    pub fn reload(&self, uri: &str, text: String, version: i32) -> Result<Arc<SourceFile>> {
        self.store(uri, text, version, false)
    }

    fn store(&self, uri: &str, text: String, version: i32, ordered: bool) -> Result<Arc<SourceFile>> {
        let previous = self.get(uri);
        if let Some(previous) = previous.as_ref().filter(|p| ordered && p.version > version) {
            debug!(uri, version, current = previous.version, "ignoring older document version");
            return Ok(Arc::clone(previous));
        }
        let file = {
            let mut parser = self.parser.lock();
            Arc::new(SourceFile::build(
                &mut parser,
                uri,
                text,
                version,
                previous.as_deref(),
            )?)
        };

        let mut current = self.current.write();
        // Another writer may have stored a newer version while we parsed
        if let Some(existing) = current.get(uri).filter(|e| ordered && e.version > version) {
            debug!(uri, version, current = existing.version, "ignoring older document version");
            return Ok(Arc::clone(existing));
        }
        let mut files = (*current.files).clone();
        files.insert(uri.to_string(), file.clone());
        *current = Snapshot::new(files);
        Ok(file)
    }

    /// Drop the entry for `uri`, returning whether it existed
    pub fn remove(&self, uri: &str) -> bool {
        let mut current = self.current.write();
        if !current.files.contains_key(uri) {
            return false;
        }
        let mut files = (*current.files).clone();
        files.remove(uri);
        *current = Snapshot::new(files);
        true
    }

    /// Read and parse files in parallel, publishing them in one snapshot
    ///
    /// Unreadable files are skipped with a warning. Returns the number of
    /// files added.
    pub fn load_files(&self, paths: &[PathBuf]) -> usize {
        let parsed: Vec<Arc<SourceFile>> = paths
            .par_iter()
            .map_init(
                || ElmParser::new().ok(),
                |parser, path| {
                    let parser = parser.as_mut()?;
                    let text = match std::fs::read_to_string(path) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "skipping unreadable file");
                            return None;
                        }
                    };
                    let uri = uri_from_path(path);
                    match SourceFile::build(parser, &uri, text, 0, None) {
                        Ok(file) => Some(Arc::new(file)),
                        Err(e) => {
                            warn!(uri, error = %e, "failed to parse");
                            None
                        }
                    }
                },
            )
            .flatten()
            .collect();

        let added = parsed.len();
        let mut current = self.current.write();
        let mut files = (*current.files).clone();
        for file in parsed {
            // Documents opened while the load ran are newer than the disk
            files.entry(file.uri.clone()).or_insert(file);
        }
        *current = Snapshot::new(files);
        added
    }
}
