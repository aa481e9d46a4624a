//! Module records and the module-name index
//!
//! Every parsed file yields a [`ModuleRecord`]: its module name, what it
//! exposes, what it imports, and an index of its top-level declarations.
//! A [`ModuleTable`] maps module names to the uris declaring them for one
//! forest snapshot.
//!
//! # Default imports
//!
//! Every Elm module implicitly imports a fixed set of core modules. They are
//! appended to each record's import list (see [`default_imports`]) so
//! resolution treats them like any other import. `Basics exposing (..)` is
//! modelled as an explicit list of the names Basics provides, since the core
//! package sources are normally not part of the forest.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// Module name of files that have no module declaration
pub const IMPLICIT_MODULE: &str = "Main";

/// Values exposed by `Basics`
pub const BASICS_VALUES: &[&str] = &[
    "toFloat", "round", "floor", "ceiling", "truncate", "max", "min", "compare",
    "not", "xor", "modBy", "remainderBy", "negate", "abs", "clamp", "sqrt",
    "logBase", "e", "pi", "cos", "sin", "tan", "acos", "asin", "atan", "atan2",
    "degrees", "radians", "turns", "toPolar", "fromPolar", "isNaN",
    "isInfinite", "identity", "always", "never",
];

/// Types exposed by `Basics`, with whether their constructors are exposed
pub const BASICS_TYPES: &[(&str, bool)] = &[
    ("Int", false),
    ("Float", false),
    ("Order", true),
    ("Bool", true),
    ("Never", false),
];

/// Which namespace a name is looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Lower-case values: functions, constants, ports
    Value,
    /// Types and type aliases
    Type,
    /// Union variants and record-alias constructors
    Constructor,
}

/// One entry of an exposing list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExposedName {
    Value { name: String },
    Operator { name: String },
    /// `Type` or `Type(..)`
    Type { name: String, constructors: bool },
}

/// What a module or import exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exposing {
    /// `exposing (..)`
    Wildcard,
    Explicit(Vec<ExposedName>),
}

impl Exposing {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Exposing::Wildcard)
    }

    pub fn lists_value(&self, name: &str) -> bool {
        match self {
            Exposing::Wildcard => true,
            Exposing::Explicit(names) => names
                .iter()
                .any(|n| matches!(n, ExposedName::Value { name: v } if v == name)),
        }
    }

    /// Explicit type entry for `name`, if any
    pub fn type_entry(&self, name: &str) -> Option<&ExposedName> {
        match self {
            Exposing::Wildcard => None,
            Exposing::Explicit(names) => names
                .iter()
                .find(|n| matches!(n, ExposedName::Type { name: t, .. } if t == name)),
        }
    }

    pub fn lists_type(&self, name: &str) -> bool {
        self.is_wildcard() || self.type_entry(name).is_some()
    }

    /// Whether `Type(..)` is listed for `type_name`
    pub fn lists_constructors_of(&self, type_name: &str) -> bool {
        match self {
            Exposing::Wildcard => true,
            Exposing::Explicit(_) => matches!(
                self.type_entry(type_name),
                Some(ExposedName::Type { constructors: true, .. })
            ),
        }
    }

    /// Whether any `Type(..)` entry is present
    pub fn has_open_types(&self) -> bool {
        match self {
            Exposing::Wildcard => true,
            Exposing::Explicit(names) => names
                .iter()
                .any(|n| matches!(n, ExposedName::Type { constructors: true, .. })),
        }
    }
}

/// One import clause (written or implicit)
#[derive(Debug, Clone, Serialize)]
pub struct Import {
    pub module: String,
    pub alias: Option<String>,
    pub exposing: Option<Exposing>,
    /// The `import_clause` node, `None` for default imports
    #[serde(skip)]
    pub node: Option<NodeId>,
}

impl Import {
    fn implicit(module: &str, alias: Option<&str>, exposing: Option<Exposing>) -> Self {
        Self {
            module: module.to_string(),
            alias: alias.map(str::to_string),
            exposing,
            node: None,
        }
    }

    /// Name this import is referred to by in qualified references
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.module)
    }

    pub fn is_default(&self) -> bool {
        self.node.is_none()
    }
}

/// Imports every Elm module receives without writing them
pub fn default_imports() -> Vec<Import> {
    let value = |name: &str| ExposedName::Value {
        name: name.to_string(),
    };
    let ty = |name: &str, constructors: bool| ExposedName::Type {
        name: name.to_string(),
        constructors,
    };

    let mut basics: Vec<ExposedName> = BASICS_VALUES.iter().map(|n| value(n)).collect();
    basics.extend(BASICS_TYPES.iter().map(|(n, c)| ty(n, *c)));

    vec![
        Import::implicit("Basics", None, Some(Exposing::Explicit(basics))),
        Import::implicit(
            "List",
            None,
            Some(Exposing::Explicit(vec![
                ty("List", false),
                ExposedName::Operator {
                    name: "::".to_string(),
                },
            ])),
        ),
        Import::implicit("Maybe", None, Some(Exposing::Explicit(vec![ty("Maybe", true)]))),
        Import::implicit("Result", None, Some(Exposing::Explicit(vec![ty("Result", true)]))),
        Import::implicit("String", None, Some(Exposing::Explicit(vec![ty("String", false)]))),
        Import::implicit("Char", None, Some(Exposing::Explicit(vec![ty("Char", false)]))),
        Import::implicit("Tuple", None, None),
        Import::implicit("Debug", None, None),
        Import::implicit("Platform", None, Some(Exposing::Explicit(vec![ty("Program", false)]))),
        Import::implicit("Platform.Cmd", Some("Cmd"), Some(Exposing::Explicit(vec![ty("Cmd", false)]))),
        Import::implicit("Platform.Sub", Some("Sub"), Some(Exposing::Explicit(vec![ty("Sub", false)]))),
    ]
}

/// A union variant or record-alias constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constructor {
    pub node: NodeId,
    /// Declaration of the owning type (the alias itself for record aliases)
    pub owner: NodeId,
}

/// Everything resolution needs to know about one module
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub name: String,
    /// The `module_declaration` node, `None` for implicit `Main`
    pub declaration: Option<NodeId>,
    pub exposing: Exposing,
    /// Written imports followed by the default imports
    pub imports: Vec<Import>,
    values: HashMap<String, NodeId>,
    types: HashMap<String, NodeId>,
    constructors: HashMap<String, Constructor>,
}

impl ModuleRecord {
    /// Derive the record of a parsed file
    ///
    /// Malformed declarations are skipped; the record is always produced.
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        let root = tree.root();
        let declaration = tree.child_of_kind(root, NodeKind::ModuleDeclaration);

        let name = declaration
            .and_then(|d| tree.child_of_kind(d, NodeKind::UpperCaseQid))
            .map(|qid| qualified_name(tree, qid))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| IMPLICIT_MODULE.to_string());

        let exposing = match declaration {
            Some(d) => tree
                .child_of_kind(d, NodeKind::ExposingList)
                .map(|list| parse_exposing(tree, list))
                .unwrap_or(Exposing::Explicit(Vec::new())),
            None => Exposing::Wildcard,
        };

        let mut imports: Vec<Import> = tree
            .children_of_kind(root, NodeKind::ImportClause)
            .filter_map(|clause| parse_import(tree, clause))
            .collect();
        imports.extend(default_imports());

        let mut record = Self {
            name,
            declaration,
            exposing,
            imports,
            values: HashMap::new(),
            types: HashMap::new(),
            constructors: HashMap::new(),
        };
        record.index_declarations(tree);
        record
    }

    fn index_declarations(&mut self, tree: &SyntaxTree) {
        for decl in tree.code_children(tree.root()) {
            match tree.kind(decl) {
                NodeKind::ValueDeclaration => {
                    if let Some(name) = declared_value_name(tree, decl) {
                        self.values.entry(name.to_string()).or_insert(decl);
                    }
                }
                NodeKind::PortAnnotation => {
                    if let Some(id) = tree.child_of_kind(decl, NodeKind::LowerCaseIdentifier) {
                        self.values.entry(tree.text(id).to_string()).or_insert(decl);
                    }
                }
                NodeKind::TypeDeclaration => {
                    if let Some(id) = tree.child_of_kind(decl, NodeKind::UpperCaseIdentifier) {
                        self.types.entry(tree.text(id).to_string()).or_insert(decl);
                    }
                    for variant in tree.children_of_kind(decl, NodeKind::UnionVariant) {
                        if let Some(id) = tree.child_of_kind(variant, NodeKind::UpperCaseIdentifier)
                        {
                            self.constructors
                                .entry(tree.text(id).to_string())
                                .or_insert(Constructor {
                                    node: variant,
                                    owner: decl,
                                });
                        }
                    }
                }
                NodeKind::TypeAliasDeclaration => {
                    if let Some(id) = tree.child_of_kind(decl, NodeKind::UpperCaseIdentifier) {
                        let name = tree.text(id).to_string();
                        if is_record_alias(tree, decl) {
                            self.constructors.entry(name.clone()).or_insert(Constructor {
                                node: decl,
                                owner: decl,
                            });
                        }
                        self.types.entry(name).or_insert(decl);
                    }
                }
                _ => {}
            }
        }
    }

    /// Top-level declaration of `name` in a namespace
    pub fn declaration_of(&self, name: &str, namespace: Namespace) -> Option<NodeId> {
        match namespace {
            Namespace::Value => self.values.get(name).copied(),
            Namespace::Type => self.types.get(name).copied(),
            Namespace::Constructor => self.constructors.get(name).map(|c| c.node),
        }
    }

    pub fn constructor(&self, name: &str) -> Option<Constructor> {
        self.constructors.get(name).copied()
    }

    /// Whether importers can see `name` through this module's exposing list
    pub fn exposes(&self, tree: &SyntaxTree, name: &str, namespace: Namespace) -> bool {
        if self.declaration_of(name, namespace).is_none() {
            return false;
        }
        match namespace {
            Namespace::Value => self.exposing.lists_value(name),
            Namespace::Type => self.exposing.lists_type(name),
            Namespace::Constructor => self.constructor_visible(tree, &self.exposing, name),
        }
    }

    /// Whether `exposing` makes constructor `name` of this module visible
    pub fn constructor_visible(&self, tree: &SyntaxTree, exposing: &Exposing, name: &str) -> bool {
        let Some(ctor) = self.constructor(name) else {
            return false;
        };
        let Some(owner_name) = tree
            .child_of_kind(ctor.owner, NodeKind::UpperCaseIdentifier)
            .map(|id| tree.text(id))
        else {
            return false;
        };
        if tree.kind(ctor.owner) == NodeKind::TypeAliasDeclaration {
            exposing.lists_type(owner_name)
        } else {
            exposing.lists_constructors_of(owner_name)
        }
    }

    /// Names of all top-level values, sorted
    pub fn value_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Imports written in the file (no defaults)
    pub fn written_imports(&self) -> impl Iterator<Item = &Import> {
        self.imports.iter().filter(|i| !i.is_default())
    }
}

/// Name declared by a value declaration (`f x = ...`)
pub fn declared_value_name(tree: &SyntaxTree, decl: NodeId) -> Option<&str> {
    let left = tree.child_of_kind(decl, NodeKind::FunctionDeclarationLeft)?;
    let id = tree.child_of_kind(left, NodeKind::LowerCaseIdentifier)?;
    Some(tree.text(id))
}

/// Dotted name of an `upper_case_qid`
pub fn qualified_name(tree: &SyntaxTree, qid: NodeId) -> String {
    tree.children_of_kind(qid, NodeKind::UpperCaseIdentifier)
        .map(|id| tree.text(id))
        .collect::<Vec<_>>()
        .join(".")
}

fn is_record_alias(tree: &SyntaxTree, alias: NodeId) -> bool {
    tree.child_of_kind(alias, NodeKind::TypeExpression)
        .and_then(|expr| tree.code_children(expr).next())
        .and_then(|first| tree.get(first))
        .is_some_and(|n| n.grammar_kind == "record_type")
}

fn parse_import(tree: &SyntaxTree, clause: NodeId) -> Option<Import> {
    let qid = tree.child_of_kind(clause, NodeKind::UpperCaseQid)?;
    let module = qualified_name(tree, qid);
    if module.is_empty() {
        return None;
    }
    let alias = tree
        .child_of_kind(clause, NodeKind::AsClause)
        .and_then(|a| tree.child_of_kind(a, NodeKind::UpperCaseIdentifier))
        .map(|id| tree.text(id).to_string());
    let exposing = tree
        .child_of_kind(clause, NodeKind::ExposingList)
        .map(|list| parse_exposing(tree, list));
    Some(Import {
        module,
        alias,
        exposing,
        node: Some(clause),
    })
}

fn parse_exposing(tree: &SyntaxTree, list: NodeId) -> Exposing {
    if tree.child_of_kind(list, NodeKind::DoubleDot).is_some() {
        return Exposing::Wildcard;
    }
    let names = tree
        .code_children(list)
        .filter_map(|entry| match tree.kind(entry) {
            NodeKind::ExposedValue => Some(ExposedName::Value {
                name: tree.text(entry).trim().to_string(),
            }),
            NodeKind::ExposedOperator => Some(ExposedName::Operator {
                name: tree
                    .text(entry)
                    .trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())
                    .to_string(),
            }),
            NodeKind::ExposedType => {
                let name = tree
                    .child_of_kind(entry, NodeKind::UpperCaseIdentifier)
                    .map(|id| tree.text(id).to_string())?;
                let constructors = tree
                    .child_of_kind(entry, NodeKind::ExposedUnionConstructors)
                    .is_some();
                Some(ExposedName::Type { name, constructors })
            }
            _ => None,
        })
        .collect();
    Exposing::Explicit(names)
}

// ============================================================================
// Module table
// ============================================================================

/// Module name → declaring uris for one snapshot
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    by_name: BTreeMap<String, Vec<String>>,
}

impl ModuleTable {
    pub fn build<'a>(records: impl IntoIterator<Item = (&'a str, &'a ModuleRecord)>) -> Self {
        let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (uri, record) in records {
            by_name
                .entry(record.name.clone())
                .or_default()
                .push(uri.to_string());
        }
        for uris in by_name.values_mut() {
            uris.sort();
        }
        Self { by_name }
    }

    /// The uri declaring `module`, `None` when absent or declared twice
    pub fn uri_for(&self, module: &str) -> Option<&str> {
        match self.by_name.get(module).map(Vec::as_slice) {
            Some([uri]) => Some(uri.as_str()),
            _ => None,
        }
    }

    /// Whether some file in the forest declares `module`
    pub fn contains(&self, module: &str) -> bool {
        self.by_name.contains_key(module)
    }

    pub fn is_duplicate(&self, module: &str) -> bool {
        self.by_name.get(module).is_some_and(|u| u.len() > 1)
    }

    /// Module names declared by more than one file, with their uris
    pub fn duplicates(&self) -> Vec<(&str, &[String])> {
        self.by_name
            .iter()
            .filter(|(_, uris)| uris.len() > 1)
            .map(|(name, uris)| (name.as_str(), uris.as_slice()))
            .collect()
    }

    /// All module names with their uris, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.by_name
            .iter()
            .map(|(name, uris)| (name.as_str(), uris.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
