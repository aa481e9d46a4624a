//! Definition resolution
//!
//! Maps a reference node to the node that defines it, following Elm's
//! scoping rules:
//!
//! 1. Definition sites (function names, annotations, pattern bindings, type,
//!    variant and alias names, module names) resolve to their own declaration.
//! 2. Unqualified names search lexical scopes innermost first: case-branch
//!    patterns, let bindings, lambda and function arguments, then the
//!    module's top level. All bindings of a scope are visible everywhere in
//!    that scope, so recursive and forward references need no special case.
//! 3. Names not bound locally are looked up through the imports exposing
//!    them. More than one distinct provider is ambiguous.
//! 4. Qualified names (`Alias.name`) go through the import with that alias
//!    (or module name) straight to the target's top level.
//!
//! Resolution is a pure read over one [`Snapshot`]. An unresolved reference
//! is not an error; the [`Unresolved`] reason is what the syntax channel
//! turns into warnings.

use std::sync::Arc;

use lsp_types::Range;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::forest::{Snapshot, SourceFile};
use crate::module_table::{qualified_name, Import, ModuleRecord, Namespace};
use crate::syntax::{NodeId, NodeKind, Point, Span, SyntaxTree};

/// Whether exposing lists restrict qualified references
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualifiedAccess {
    /// `Alias.name` reaches every top-level declaration of the target
    #[default]
    Open,
    /// `Alias.name` requires the target to expose `name`
    ExposedOnly,
}

/// A resolved definition
#[derive(Debug, Clone)]
pub struct Definition {
    pub uri: String,
    pub file: Arc<SourceFile>,
    pub node: NodeId,
}

impl Definition {
    pub fn kind(&self) -> NodeKind {
        self.file.tree.kind(self.node)
    }

    pub fn span(&self) -> Span {
        self.file.tree.span(self.node)
    }

    pub fn text(&self) -> &str {
        self.file.tree.text(self.node)
    }

    /// Protocol range of the definition node in its own file
    pub fn range(&self) -> Range {
        self.file.lines.range(self.file.text(), &self.span())
    }
}

/// Why a reference did not resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Unresolved {
    /// The node does not name anything (literal, keyword, field, ...)
    NotAReference,
    /// No scope or import provides the name
    NotFound { name: String },
    /// Provided by a module outside the forest
    External { module: String },
    /// Several imports expose the name
    Ambiguous { name: String, modules: Vec<String> },
    /// No import is known under this qualifier
    UnknownQualifier { qualifier: String },
    /// The qualified module is in the forest but lacks the member
    MissingMember { module: String, name: String },
    /// The module name is declared by more than one file
    DuplicateModule { module: String },
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(Definition),
    Unresolved(Unresolved),
}

impl Resolution {
    pub fn definition(self) -> Option<Definition> {
        match self {
            Resolution::Resolved(def) => Some(def),
            Resolution::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    fn unresolved(reason: Unresolved) -> Self {
        Resolution::Unresolved(reason)
    }
}

/// What a node refers to, before any lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// The node is (part of) a definition; resolves to this node in the same file
    Site(NodeId),
    Unqualified {
        name: String,
        namespace: Namespace,
    },
    Qualified {
        qualifier: String,
        name: String,
        namespace: Namespace,
    },
    /// Qualifier segment of a qualified reference
    Qualifier(String),
    /// Module name in an import clause or `as` alias
    Module(String),
    /// Entry of the file's own exposing list
    ExposedHere {
        name: String,
        namespace: Namespace,
    },
    /// Entry of an import's exposing list
    ExposedBy {
        module: String,
        name: String,
        namespace: Namespace,
    },
    None,
}

impl Reference {
    /// Whether the node uses a name defined elsewhere
    pub fn is_use(&self) -> bool {
        matches!(
            self,
            Reference::Unqualified { .. } | Reference::Qualified { .. } | Reference::Qualifier(_)
        )
    }
}

/// Classify a node of `tree`; missing children classify as `None`
pub fn classify(tree: &SyntaxTree, node: NodeId) -> Reference {
    let Some(parent) = tree.parent(node) else {
        return Reference::None;
    };
    match tree.kind(node) {
        NodeKind::LowerCaseIdentifier => classify_lower(tree, node, parent),
        NodeKind::UpperCaseIdentifier => classify_upper(tree, node, parent),
        // A cursor on the dot of a qualified name lands on the qid itself
        NodeKind::ValueQid => tree
            .children_of_kind(node, NodeKind::LowerCaseIdentifier)
            .last()
            .map(|id| classify(tree, id))
            .unwrap_or(Reference::None),
        NodeKind::UpperCaseQid => tree
            .children_of_kind(node, NodeKind::UpperCaseIdentifier)
            .last()
            .map(|id| classify(tree, id))
            .unwrap_or(Reference::None),
        _ => Reference::None,
    }
}

fn classify_lower(tree: &SyntaxTree, node: NodeId, parent: NodeId) -> Reference {
    let name = tree.text(node).to_string();
    match tree.kind(parent) {
        NodeKind::ValueQid => {
            let qualifier = upper_segments(tree, parent);
            if qualifier.is_empty() {
                Reference::Unqualified {
                    name,
                    namespace: Namespace::Value,
                }
            } else {
                Reference::Qualified {
                    qualifier: qualifier.join("."),
                    name,
                    namespace: Namespace::Value,
                }
            }
        }
        NodeKind::RecordBaseIdentifier => Reference::Unqualified {
            name,
            namespace: Namespace::Value,
        },
        NodeKind::FunctionDeclarationLeft => {
            let is_name = tree.child_of_kind(parent, NodeKind::LowerCaseIdentifier) == Some(node);
            match tree.parent(parent) {
                Some(decl) if is_name => Reference::Site(decl),
                _ => Reference::None,
            }
        }
        NodeKind::TypeAnnotation => {
            let declaration = tree
                .next_sibling(parent)
                .into_iter()
                .chain(tree.next_sibling(parent).and_then(|n| tree.next_sibling(n)))
                .find(|s| {
                    tree.kind(*s) == NodeKind::ValueDeclaration
                        && crate::module_table::declared_value_name(tree, *s) == Some(name.as_str())
                });
            Reference::Site(declaration.unwrap_or(parent))
        }
        NodeKind::PortAnnotation => Reference::Site(parent),
        NodeKind::LowerPattern => Reference::Site(parent),
        NodeKind::ExposedValue => exposing_entry(tree, parent, name, Namespace::Value),
        _ => Reference::None,
    }
}

fn classify_upper(tree: &SyntaxTree, node: NodeId, parent: NodeId) -> Reference {
    match tree.kind(parent) {
        NodeKind::UpperCaseQid => {
            let Some(context) = tree.parent(parent) else {
                return Reference::None;
            };
            let segments: Vec<NodeId> = tree
                .children_of_kind(parent, NodeKind::UpperCaseIdentifier)
                .collect();
            match tree.kind(context) {
                NodeKind::ModuleDeclaration => Reference::Site(context),
                NodeKind::ImportClause => Reference::Module(qualified_name(tree, parent)),
                NodeKind::ValueExpr | NodeKind::UnionPattern | NodeKind::TypeRef => {
                    let namespace = if tree.kind(context) == NodeKind::TypeRef {
                        Namespace::Type
                    } else {
                        Namespace::Constructor
                    };
                    let Some((last, qualifier)) = segments.split_last() else {
                        return Reference::None;
                    };
                    let qualifier: Vec<&str> = qualifier.iter().map(|s| tree.text(*s)).collect();
                    let name = tree.text(*last).to_string();
                    if *last != node {
                        Reference::Qualifier(qualifier.join("."))
                    } else if qualifier.is_empty() {
                        Reference::Unqualified { name, namespace }
                    } else {
                        Reference::Qualified {
                            qualifier: qualifier.join("."),
                            name,
                            namespace,
                        }
                    }
                }
                _ => Reference::None,
            }
        }
        NodeKind::ValueQid => Reference::Qualifier(upper_segments(tree, parent).join(".")),
        NodeKind::TypeDeclaration | NodeKind::TypeAliasDeclaration | NodeKind::UnionVariant => {
            Reference::Site(parent)
        }
        NodeKind::ExposedType => {
            exposing_entry(tree, parent, tree.text(node).to_string(), Namespace::Type)
        }
        NodeKind::AsClause => tree
            .parent(parent)
            .and_then(|clause| tree.child_of_kind(clause, NodeKind::UpperCaseQid))
            .map(|qid| Reference::Module(qualified_name(tree, qid)))
            .unwrap_or(Reference::None),
        _ => Reference::None,
    }
}

fn upper_segments(tree: &SyntaxTree, qid: NodeId) -> Vec<&str> {
    tree.children_of_kind(qid, NodeKind::UpperCaseIdentifier)
        .map(|id| tree.text(id))
        .collect()
}

fn exposing_entry(tree: &SyntaxTree, entry: NodeId, name: String, namespace: Namespace) -> Reference {
    let Some(owner) = tree.parent(entry).and_then(|list| tree.parent(list)) else {
        return Reference::None;
    };
    match tree.kind(owner) {
        NodeKind::ModuleDeclaration => Reference::ExposedHere { name, namespace },
        NodeKind::ImportClause => match tree.child_of_kind(owner, NodeKind::UpperCaseQid) {
            Some(qid) => Reference::ExposedBy {
                module: qualified_name(tree, qid),
                name,
                namespace,
            },
            None => Reference::None,
        },
        _ => Reference::None,
    }
}

// ============================================================================
// Lexical scopes
// ============================================================================

/// Innermost local binding of `name` visible from `from`
fn lookup_local(tree: &SyntaxTree, from: NodeId, name: &str) -> Option<NodeId> {
    tree.ancestors(from).find_map(|scope| match tree.kind(scope) {
        NodeKind::CaseOfBranch => tree
            .code_children(scope)
            .next()
            .and_then(|pattern| find_binding(tree, pattern, name)),
        NodeKind::LetInExpr => tree
            .children_of_kind(scope, NodeKind::ValueDeclaration)
            .find_map(|decl| {
                if crate::module_table::declared_value_name(tree, decl) == Some(name) {
                    return Some(decl);
                }
                tree.child_of_kind(decl, NodeKind::Pattern)
                    .and_then(|pattern| find_binding(tree, pattern, name))
            }),
        NodeKind::AnonymousFunctionExpr => {
            let params: Vec<NodeId> = tree.code_children(scope).collect();
            params
                .split_last()
                .and_then(|(_, params)| params.iter().find_map(|p| find_binding(tree, *p, name)))
        }
        NodeKind::ValueDeclaration => tree
            .child_of_kind(scope, NodeKind::FunctionDeclarationLeft)
            .and_then(|left| {
                tree.code_children(left)
                    .skip(1)
                    .find_map(|param| find_binding(tree, param, name))
            }),
        _ => None,
    })
}

/// A `lower_pattern` binding `name` anywhere inside `pattern`
fn find_binding(tree: &SyntaxTree, pattern: NodeId, name: &str) -> Option<NodeId> {
    tree.descendants_of_kind(pattern, NodeKind::LowerPattern)
        .find(|lp| tree.text(*lp) == name)
}

// ============================================================================
// Resolver
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    InForest { uri: String, node: NodeId },
    External { module: String },
}

/// Resolves references against one snapshot
pub struct Resolver<'s> {
    snapshot: &'s Snapshot,
    qualified_access: QualifiedAccess,
}

impl<'s> Resolver<'s> {
    pub fn new(snapshot: &'s Snapshot, qualified_access: QualifiedAccess) -> Self {
        Self {
            snapshot,
            qualified_access,
        }
    }

    /// Resolve the smallest node covering `point` in `uri`
    pub fn resolve_at(&self, uri: &str, point: Point) -> Resolution {
        let Some(file) = self.snapshot.get(uri) else {
            return Resolution::unresolved(Unresolved::NotAReference);
        };
        match file.tree.named_descendant_for_point(point) {
            Some(node) => self.resolve(uri, node),
            None => Resolution::unresolved(Unresolved::NotAReference),
        }
    }

    pub fn resolve(&self, uri: &str, node: NodeId) -> Resolution {
        let Some(file) = self.snapshot.get(uri) else {
            return Resolution::unresolved(Unresolved::NotAReference);
        };
        let reference = classify(&file.tree, node);
        let resolution = self.resolve_reference(file, node, reference);
        if let Resolution::Unresolved(reason) = &resolution {
            trace!(uri, node = node.index(), ?reason, "unresolved");
        }
        resolution
    }

    /// Resolve an already classified reference found at `node` of `file`
    pub fn resolve_reference(
        &self,
        file: &Arc<SourceFile>,
        node: NodeId,
        reference: Reference,
    ) -> Resolution {
        match reference {
            Reference::Site(site) => self.found(file, site),
            Reference::Unqualified { name, namespace } => {
                let local = match namespace {
                    Namespace::Value => lookup_local(&file.tree, node, &name),
                    _ => None,
                };
                match local.or_else(|| file.module.declaration_of(&name, namespace)) {
                    Some(def) => self.found(file, def),
                    None => self.through_imports(&file.module, &name, namespace),
                }
            }
            Reference::Qualified {
                qualifier,
                name,
                namespace,
            } => self.qualified(&file.module, &qualifier, &name, namespace),
            Reference::Qualifier(qualifier) => {
                let imports: Vec<&Import> = file
                    .module
                    .imports
                    .iter()
                    .filter(|i| i.qualifier() == qualifier)
                    .collect();
                if imports.is_empty() {
                    return Resolution::unresolved(Unresolved::UnknownQualifier { qualifier });
                }
                imports
                    .iter()
                    .map(|i| self.module(&i.module))
                    .find(Resolution::is_resolved)
                    .unwrap_or_else(|| self.module(&imports[0].module))
            }
            Reference::Module(module) => self.module(&module),
            Reference::ExposedHere { name, namespace } => {
                match file.module.declaration_of(&name, namespace) {
                    Some(def) => self.found(file, def),
                    None => Resolution::unresolved(Unresolved::NotFound { name }),
                }
            }
            Reference::ExposedBy {
                module,
                name,
                namespace,
            } => match self.module_file(&module) {
                Ok(target) => match target.module.declaration_of(&name, namespace) {
                    Some(def) => self.found(target, def),
                    None => Resolution::unresolved(Unresolved::MissingMember { module, name }),
                },
                Err(reason) => Resolution::unresolved(reason),
            },
            Reference::None => Resolution::unresolved(Unresolved::NotAReference),
        }
    }

    fn found(&self, file: &Arc<SourceFile>, node: NodeId) -> Resolution {
        Resolution::Resolved(Definition {
            uri: file.uri.clone(),
            file: Arc::clone(file),
            node,
        })
    }

    /// The single in-forest file declaring `module`
    fn module_file(&self, module: &str) -> std::result::Result<&'s Arc<SourceFile>, Unresolved> {
        if let Some(file) = self.snapshot.file_for_module(module) {
            return Ok(file);
        }
        if self.snapshot.modules().is_duplicate(module) {
            Err(Unresolved::DuplicateModule {
                module: module.to_string(),
            })
        } else {
            Err(Unresolved::External {
                module: module.to_string(),
            })
        }
    }

    fn module(&self, module: &str) -> Resolution {
        match self.module_file(module) {
            Ok(file) => {
                let node = file.module.declaration.unwrap_or(file.tree.root());
                self.found(file, node)
            }
            Err(reason) => Resolution::unresolved(reason),
        }
    }

    fn through_imports(&self, record: &ModuleRecord, name: &str, namespace: Namespace) -> Resolution {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut maybe_external: Option<&str> = None;

        for import in &record.imports {
            let Some(exposing) = &import.exposing else {
                continue;
            };
            match self.module_file(&import.module) {
                Ok(target) => {
                    let listed = match namespace {
                        Namespace::Value => exposing.lists_value(name),
                        Namespace::Type => exposing.lists_type(name),
                        Namespace::Constructor => {
                            target.module.constructor_visible(&target.tree, exposing, name)
                        }
                    };
                    if !listed || !target.module.exposes(&target.tree, name, namespace) {
                        continue;
                    }
                    if let Some(node) = target.module.declaration_of(name, namespace) {
                        push_unique(
                            &mut candidates,
                            Candidate::InForest {
                                uri: target.uri.clone(),
                                node,
                            },
                        );
                    }
                }
                Err(_) => {
                    let listed = match namespace {
                        Namespace::Value => !exposing.is_wildcard() && exposing.lists_value(name),
                        Namespace::Type => !exposing.is_wildcard() && exposing.lists_type(name),
                        Namespace::Constructor => false,
                    };
                    if listed {
                        push_unique(
                            &mut candidates,
                            Candidate::External {
                                module: import.module.clone(),
                            },
                        );
                    } else if exposing.is_wildcard()
                        || (namespace == Namespace::Constructor && exposing.has_open_types())
                    {
                        maybe_external.get_or_insert(import.module.as_str());
                    }
                }
            }
        }

        match candidates.as_slice() {
            [Candidate::InForest { uri, node }] => match self.snapshot.get(uri) {
                Some(file) => self.found(file, *node),
                None => Resolution::unresolved(Unresolved::NotFound {
                    name: name.to_string(),
                }),
            },
            [Candidate::External { module }] => Resolution::unresolved(Unresolved::External {
                module: module.clone(),
            }),
            [] => match maybe_external {
                Some(module) => Resolution::unresolved(Unresolved::External {
                    module: module.to_string(),
                }),
                None => Resolution::unresolved(Unresolved::NotFound {
                    name: name.to_string(),
                }),
            },
            many => Resolution::unresolved(Unresolved::Ambiguous {
                name: name.to_string(),
                modules: many
                    .iter()
                    .map(|c| match c {
                        Candidate::InForest { uri, .. } => self
                            .snapshot
                            .get(uri)
                            .map(|f| f.module.name.clone())
                            .unwrap_or_else(|| uri.clone()),
                        Candidate::External { module } => module.clone(),
                    })
                    .collect(),
            }),
        }
    }

    fn qualified(
        &self,
        record: &ModuleRecord,
        qualifier: &str,
        name: &str,
        namespace: Namespace,
    ) -> Resolution {
        let imports: Vec<&Import> = record
            .imports
            .iter()
            .filter(|i| i.qualifier() == qualifier)
            .collect();
        if imports.is_empty() {
            return Resolution::unresolved(Unresolved::UnknownQualifier {
                qualifier: qualifier.to_string(),
            });
        }

        let mut external: Option<Unresolved> = None;
        let mut checked: Option<&str> = None;
        for import in &imports {
            match self.module_file(&import.module) {
                Ok(target) => {
                    checked.get_or_insert(import.module.as_str());
                    let visible = match self.qualified_access {
                        QualifiedAccess::Open => true,
                        QualifiedAccess::ExposedOnly => {
                            target.module.exposes(&target.tree, name, namespace)
                        }
                    };
                    if let Some(node) = target.module.declaration_of(name, namespace) {
                        if visible {
                            return self.found(target, node);
                        }
                    }
                }
                Err(reason) => {
                    external.get_or_insert(reason);
                }
            }
        }

        match (external, checked) {
            (Some(reason), _) => Resolution::unresolved(reason),
            (None, Some(module)) => Resolution::unresolved(Unresolved::MissingMember {
                module: module.to_string(),
                name: name.to_string(),
            }),
            (None, None) => Resolution::unresolved(Unresolved::UnknownQualifier {
                qualifier: qualifier.to_string(),
            }),
        }
    }
}

fn push_unique(candidates: &mut Vec<Candidate>, candidate: Candidate) {
    if !candidates.contains(&candidate) {
        candidates.push(candidate);
    }
}
