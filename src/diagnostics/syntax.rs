//! Live-syntax channel
//!
//! Runs inline on the current snapshot. Reports error and missing nodes,
//! references that cannot resolve inside the forest, and module names
//! declared by more than one file.

use tracing::debug;

use super::aggregator::{AggregatorHandle, ChannelReport};
use super::{Channel, Diagnostic, Severity};
use crate::forest::{Snapshot, SourceFile};
use crate::module_table::Namespace;
use crate::resolve::{classify, QualifiedAccess, Reference, Resolution, Resolver, Unresolved};
use crate::syntax::{NodeId, NodeKind};

#[derive(Debug, Clone)]
pub struct SyntaxChannel {
    aggregator: AggregatorHandle,
    qualified_access: QualifiedAccess,
}

impl SyntaxChannel {
    pub fn new(aggregator: AggregatorHandle, qualified_access: QualifiedAccess) -> Self {
        Self {
            aggregator,
            qualified_access,
        }
    }

    /// Diagnose `uri` and every file importing its module
    pub fn run(&self, sequence: u64, snapshot: &Snapshot, uri: &str) -> usize {
        let mut report = ChannelReport::new(Channel::Syntax, sequence);
        let Some(file) = snapshot.get(uri) else {
            return 0;
        };
        report
            .files
            .insert(uri.to_string(), diagnose(snapshot, uri, self.qualified_access));
        for importer in snapshot.importers_of(&file.module.name) {
            if importer != uri {
                report.files.insert(
                    importer.to_string(),
                    diagnose(snapshot, importer, self.qualified_access),
                );
            }
        }
        let files = report.files.len();
        debug!(uri, files, sequence, "syntax diagnostics");
        self.aggregator.report(report);
        files
    }

    /// Diagnose every file of the snapshot in one report
    pub fn run_all(&self, sequence: u64, snapshot: &Snapshot) -> usize {
        let mut report = ChannelReport::new(Channel::Syntax, sequence);
        for uri in snapshot.uris() {
            report
                .files
                .insert(uri.to_string(), diagnose(snapshot, uri, self.qualified_access));
        }
        let files = report.files.len();
        self.aggregator.report(report);
        files
    }
}

/// Syntax and resolution diagnostics of one file
pub fn diagnose(snapshot: &Snapshot, uri: &str, qualified_access: QualifiedAccess) -> Vec<Diagnostic> {
    let Some(file) = snapshot.get(uri) else {
        return Vec::new();
    };
    let tree = &file.tree;
    let mut diagnostics = Vec::new();

    for node in tree.descendants(tree.root()) {
        match tree.kind(node) {
            NodeKind::Error if !inside_error(file, node) => {
                diagnostics.push(at(file, node, Severity::Error, "Syntax error".to_string()));
            }
            NodeKind::Missing if !inside_error(file, node) => {
                let grammar_kind = tree.get(node).map(|n| n.grammar_kind).unwrap_or("token");
                diagnostics.push(at(file, node, Severity::Error, format!("Missing {}", grammar_kind)));
            }
            _ => {}
        }
    }

    if let Some(declaration) = file.module.declaration {
        let modules = snapshot.modules();
        if modules.is_duplicate(&file.module.name) {
            let others: Vec<&str> = modules
                .iter()
                .find(|(name, _)| *name == file.module.name)
                .map(|(_, uris)| uris.iter().map(String::as_str).filter(|u| *u != uri).collect())
                .unwrap_or_default();
            diagnostics.push(at(
                file,
                declaration,
                Severity::Warning,
                format!(
                    "Module `{}` is also declared in {}",
                    file.module.name,
                    others.join(", ")
                ),
            ));
        }
    }

    let resolver = Resolver::new(snapshot, qualified_access);
    let identifiers = tree.descendants(tree.root()).filter(|n| {
        matches!(
            tree.kind(*n),
            NodeKind::LowerCaseIdentifier | NodeKind::UpperCaseIdentifier
        )
    });
    for node in identifiers {
        let reference = classify(tree, node);
        // Qualified findings cover the whole `Alias.name`
        let (namespace, target) = match &reference {
            Reference::Unqualified { namespace, .. } => (*namespace, node),
            Reference::Qualified { namespace, .. } => (*namespace, tree.parent(node).unwrap_or(node)),
            _ => continue,
        };
        let Resolution::Unresolved(reason) = resolver.resolve_reference(file, node, reference) else {
            continue;
        };
        let message = match reason {
            Unresolved::Ambiguous { name, modules } => {
                format!("`{}` is exposed by several imports: {}", name, modules.join(", "))
            }
            Unresolved::UnknownQualifier { qualifier } => {
                format!("No import is named `{}`", qualifier)
            }
            Unresolved::MissingMember { module, name } => {
                format!("Module `{}` does not expose `{}`", module, name)
            }
            Unresolved::NotFound { name } if namespace == Namespace::Value => {
                format!("Cannot find `{}`", name)
            }
            _ => continue,
        };
        diagnostics.push(at(file, target, Severity::Warning, message));
    }

    diagnostics
}

fn inside_error(file: &SourceFile, node: NodeId) -> bool {
    file.tree
        .ancestors(node)
        .skip(1)
        .any(|a| file.tree.kind(a) == NodeKind::Error)
}

fn at(file: &SourceFile, node: NodeId, severity: Severity, message: String) -> Diagnostic {
    let range = file.lines.range(file.text(), &file.tree.span(node));
    Diagnostic::new(Channel::Syntax, range, severity, message)
}
