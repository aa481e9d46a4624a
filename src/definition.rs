//! Position-based definition and hover queries
//!
//! Converts an editor position into a tree point, resolves the node under
//! it, and converts the definition back into an editor range using the
//! target file's own text.

use lsp_types::{Position, Range};
use serde::Serialize;
use tracing::debug;

use crate::forest::Snapshot;
use crate::hint::hint_for;
use crate::resolve::{QualifiedAccess, Resolution, Resolver};

/// Where a definition lives, in protocol coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionLocation {
    pub uri: String,
    pub range: Range,
}

/// Definition and hover lookups over forest snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionService {
    qualified_access: QualifiedAccess,
}

impl DefinitionService {
    pub fn new(qualified_access: QualifiedAccess) -> Self {
        Self { qualified_access }
    }

    /// Resolve whatever is under `position` in `uri`
    pub fn resolve(&self, snapshot: &Snapshot, uri: &str, position: Position) -> Option<Resolution> {
        let file = snapshot.get(uri)?;
        let point = file.lines.point(file.text(), position);
        Some(Resolver::new(snapshot, self.qualified_access).resolve_at(uri, point))
    }

    /// Location of the definition under `position`, `None` if nothing resolves
    pub fn definition(&self, snapshot: &Snapshot, uri: &str, position: Position) -> Option<DefinitionLocation> {
        match self.resolve(snapshot, uri, position)? {
            Resolution::Resolved(def) => {
                // The target may have been dropped since the snapshot was taken
                snapshot.get(&def.uri)?;
                Some(DefinitionLocation {
                    range: def.range(),
                    uri: def.uri,
                })
            }
            Resolution::Unresolved(reason) => {
                debug!(uri, line = position.line, character = position.character, ?reason, "no definition");
                None
            }
        }
    }

    /// Hover text for the definition under `position`
    pub fn hover(&self, snapshot: &Snapshot, uri: &str, position: Position) -> Option<String> {
        let def = self.resolve(snapshot, uri, position)?.definition()?;
        hint_for(&def.file.tree, def.node)
    }
}
