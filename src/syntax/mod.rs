//! Arena syntax trees for Elm sources
//!
//! Files are parsed with tree-sitter-elm and then lowered into an immutable
//! [`SyntaxTree`]: a flat vector of nodes addressed by [`NodeId`], where
//! parent and child links are plain indices. Node kinds are a closed
//! [`NodeKind`] enum so callers match exhaustively instead of comparing
//! grammar strings.
//!
//! # Layout
//!
//! ```text
//! tree-sitter Tree ──lower──> SyntaxTree { source, nodes: [file, module_declaration, ...] }
//!                                           NodeId(0) is always the root
//! ```
//!
//! Only named grammar nodes (and MISSING placeholders inserted by error
//! recovery) are kept. Punctuation and keyword tokens are dropped.

pub mod lower;
pub mod parser;

pub use lower::lower;
pub use parser::{compute_edit, ElmParser, ParseOutcome};

use serde::Serialize;

/// A row/column position inside a source file (0-based, column in bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl From<tree_sitter::Point> for Point {
    fn from(p: tree_sitter::Point) -> Self {
        Self {
            row: p.row,
            column: p.column,
        }
    }
}

/// Source extent of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: Point,
    pub end: Point,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Span {
    /// Inclusive on both ends, like tree-sitter's descendant-for-point lookup
    pub fn contains(&self, point: Point) -> bool {
        self.start <= point && point <= self.end
    }

    pub fn contains_span(&self, other: &Span) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }

    pub fn is_empty(&self) -> bool {
        self.start_byte == self.end_byte
    }
}

/// Index of a node inside its [`SyntaxTree`]
///
/// Ids are only meaningful for the tree that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of node kinds the engine distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    ModuleDeclaration,
    ExposingList,
    ExposedValue,
    ExposedType,
    ExposedUnionConstructors,
    ExposedOperator,
    DoubleDot,
    ImportClause,
    AsClause,
    UpperCaseQid,
    ValueQid,
    UpperCaseIdentifier,
    LowerCaseIdentifier,
    ValueDeclaration,
    FunctionDeclarationLeft,
    TypeAnnotation,
    TypeDeclaration,
    UnionVariant,
    TypeAliasDeclaration,
    PortAnnotation,
    InfixDeclaration,
    ValueExpr,
    LetInExpr,
    CaseOfExpr,
    CaseOfBranch,
    AnonymousFunctionExpr,
    Pattern,
    LowerPattern,
    UnionPattern,
    RecordPattern,
    TypeRef,
    TypeExpression,
    TypeVariable,
    LowerTypeName,
    FieldAccessExpr,
    RecordBaseIdentifier,
    BlockComment,
    LineComment,
    Error,
    Missing,
    Other,
}

impl NodeKind {
    /// Map a tree-sitter-elm node kind onto the closed enum
    pub fn from_grammar(kind: &str) -> Self {
        match kind {
            "file" => Self::File,
            "module_declaration" => Self::ModuleDeclaration,
            "exposing_list" => Self::ExposingList,
            "exposed_value" => Self::ExposedValue,
            "exposed_type" => Self::ExposedType,
            "exposed_union_constructors" => Self::ExposedUnionConstructors,
            "exposed_operator" => Self::ExposedOperator,
            "double_dot" => Self::DoubleDot,
            "import_clause" => Self::ImportClause,
            "as_clause" => Self::AsClause,
            "upper_case_qid" => Self::UpperCaseQid,
            "value_qid" => Self::ValueQid,
            "upper_case_identifier" => Self::UpperCaseIdentifier,
            "lower_case_identifier" => Self::LowerCaseIdentifier,
            "value_declaration" => Self::ValueDeclaration,
            "function_declaration_left" => Self::FunctionDeclarationLeft,
            "type_annotation" => Self::TypeAnnotation,
            "type_declaration" => Self::TypeDeclaration,
            "union_variant" => Self::UnionVariant,
            "type_alias_declaration" => Self::TypeAliasDeclaration,
            "port_annotation" => Self::PortAnnotation,
            "infix_declaration" => Self::InfixDeclaration,
            "value_expr" => Self::ValueExpr,
            "let_in_expr" => Self::LetInExpr,
            "case_of_expr" => Self::CaseOfExpr,
            "case_of_branch" => Self::CaseOfBranch,
            "anonymous_function_expr" => Self::AnonymousFunctionExpr,
            "pattern" => Self::Pattern,
            "lower_pattern" => Self::LowerPattern,
            "union_pattern" => Self::UnionPattern,
            "record_pattern" => Self::RecordPattern,
            "type_ref" => Self::TypeRef,
            "type_expression" => Self::TypeExpression,
            "type_variable" => Self::TypeVariable,
            "lower_type_name" => Self::LowerTypeName,
            "field_access_expr" => Self::FieldAccessExpr,
            "record_base_identifier" => Self::RecordBaseIdentifier,
            "block_comment" => Self::BlockComment,
            "line_comment" => Self::LineComment,
            "ERROR" => Self::Error,
            _ => Self::Other,
        }
    }

    /// Comments are extras: they may appear between any two nodes
    pub fn is_comment(self) -> bool {
        matches!(self, Self::BlockComment | Self::LineComment)
    }

    /// Declarations that may appear at the top level of a module
    pub fn is_top_level_declaration(self) -> bool {
        matches!(
            self,
            Self::ValueDeclaration
                | Self::TypeDeclaration
                | Self::TypeAliasDeclaration
                | Self::PortAnnotation
                | Self::TypeAnnotation
                | Self::InfixDeclaration
        )
    }
}

/// One node of the arena
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Grammar name as reported by tree-sitter (useful for `Other` and `Missing`)
    pub grammar_kind: &'static str,
    pub span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An immutable parsed file
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
    pub(crate) fn from_parts(source: String, nodes: Vec<SyntaxNode>) -> Self {
        Self { source, nodes }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.nodes.get(id.index())
    }

    /// Kind of a node, `Other` for ids that do not belong to this tree
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.get(id).map(|n| n.kind).unwrap_or(NodeKind::Other)
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.get(id).map(|n| n.span).unwrap_or_default()
    }

    /// Source text covered by a node
    pub fn text(&self, id: NodeId) -> &str {
        self.get(id)
            .and_then(|n| self.source.get(n.span.start_byte..n.span.end_byte))
            .unwrap_or("")
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Children that are not comments
    pub fn code_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| !self.kind(*c).is_comment())
    }

    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.kind(*c) == kind)
    }

    pub fn children_of_kind(&self, id: NodeId, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.kind(*c) == kind)
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Pre-order walk of a subtree, including `id` itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = if self.get(id).is_some() { vec![id] } else { Vec::new() };
        Descendants { tree: self, stack }
    }

    /// Descendants of a given kind, in source order
    pub fn descendants_of_kind(&self, id: NodeId, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(id).filter(move |d| self.kind(*d) == kind)
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    fn sibling_position(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let pos = self.children(parent).iter().position(|c| *c == id)?;
        Some((parent, pos))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, pos) = self.sibling_position(id)?;
        self.children(parent).get(pos + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, pos) = self.sibling_position(id)?;
        pos.checked_sub(1)
            .and_then(|p| self.children(parent).get(p).copied())
    }

    /// Smallest node whose span covers `point`
    ///
    /// When the point sits exactly between two adjacent nodes the one that
    /// starts there wins, matching where an editor cursor "is".
    pub fn named_descendant_for_point(&self, point: Point) -> Option<NodeId> {
        let root = self.root();
        if !self.get(root)?.span.contains(point) {
            return None;
        }
        let mut current = root;
        'descend: loop {
            let mut touching_end = None;
            for &child in self.children(current) {
                let span = self.span(child);
                if span.start <= point && point < span.end {
                    current = child;
                    continue 'descend;
                }
                if span.end == point && touching_end.is_none() {
                    touching_end = Some(child);
                }
            }
            match touching_end {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }

    /// Whether error recovery left ERROR or MISSING nodes anywhere
    pub fn has_errors(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n.kind, NodeKind::Error | NodeKind::Missing))
    }
}

pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(current).iter().rev().copied());
        Some(current)
    }
}

/// Parse `source` from scratch into an arena tree
///
/// Convenience for tests and one-shot callers; the forest goes through
/// [`ElmParser`] so it can reuse previous trees.
pub fn parse(source: &str) -> crate::Result<SyntaxTree> {
    let mut parser = ElmParser::new()?;
    let (tree, _) = parser.parse(source, None)?;
    Ok(lower(&tree, source.to_string()))
}
