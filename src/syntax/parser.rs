//! tree-sitter-elm parser with incremental re-parsing
//!
//! When a previous tree for the same document is available, the edit between
//! the old and new text is computed and applied to a copy of the old tree so
//! tree-sitter can reuse unchanged subtrees:
//!
//! 1. Diff old and new source (first and last differing byte)
//! 2. `tree.edit(&edit)` on a clone of the previous tree
//! 3. `parser.parse(new_source, Some(&edited))`
//!
//! The result is identical to a full parse; only the work differs.

use tree_sitter::{InputEdit, Parser, Point, Tree};

use crate::error::{EngineError, Result};

/// How a tree was produced
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// No previous tree was supplied
    Full,
    /// Previous tree was reused through an edit
    Incremental { edit: InputEdit },
    /// Text was identical, the previous tree was returned as-is
    Unchanged,
}

impl ParseOutcome {
    pub fn is_incremental(&self) -> bool {
        matches!(self, ParseOutcome::Incremental { .. })
    }
}

/// Elm parser instance (not `Sync`; the forest keeps it behind a mutex)
pub struct ElmParser {
    parser: Parser,
}

impl ElmParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_elm::LANGUAGE.into())
            .map_err(|e| EngineError::ParseFailure {
                message: format!("Failed to load the Elm grammar: {}", e),
            })?;
        Ok(Self { parser })
    }

    /// Parse `source`, reusing `previous` (old text and tree) when given
    pub fn parse(&mut self, source: &str, previous: Option<(&str, &Tree)>) -> Result<(Tree, ParseOutcome)> {
        match previous {
            Some((old_source, old_tree)) if old_source == source => {
                Ok((old_tree.clone(), ParseOutcome::Unchanged))
            }
            Some((old_source, old_tree)) => {
                let edit = compute_edit(old_source, source);
                let mut edited = old_tree.clone();
                edited.edit(&edit);
                let tree = self
                    .parser
                    .parse(source, Some(&edited))
                    .ok_or_else(|| EngineError::ParseFailure {
                        message: "Incremental parse failed".to_string(),
                    })?;
                Ok((tree, ParseOutcome::Incremental { edit }))
            }
            None => {
                let tree = self
                    .parser
                    .parse(source, None)
                    .ok_or_else(|| EngineError::ParseFailure {
                        message: "Full parse failed".to_string(),
                    })?;
                Ok((tree, ParseOutcome::Full))
            }
        }
    }
}

/// Compute the InputEdit for tree-sitter given old and new source
///
/// Finds the first and last differing bytes. Several distant changes
/// collapse into one edit spanning all of them, which is still correct.
pub fn compute_edit(old_source: &str, new_source: &str) -> InputEdit {
    let old_bytes = old_source.as_bytes();
    let new_bytes = new_source.as_bytes();

    let start_byte = old_bytes
        .iter()
        .zip(new_bytes.iter())
        .position(|(a, b)| a != b)
        .unwrap_or(old_bytes.len().min(new_bytes.len()));

    let common_suffix = old_bytes[start_byte..]
        .iter()
        .rev()
        .zip(new_bytes[start_byte..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_end_byte = old_bytes.len() - common_suffix;
    let new_end_byte = new_bytes.len() - common_suffix;

    InputEdit {
        start_byte,
        old_end_byte,
        new_end_byte,
        start_position: byte_to_point(old_bytes, start_byte),
        old_end_position: byte_to_point(old_bytes, old_end_byte),
        new_end_position: byte_to_point(new_bytes, new_end_byte),
    }
}

/// Row and byte column of an offset (tree-sitter columns count bytes)
fn byte_to_point(bytes: &[u8], byte_offset: usize) -> Point {
    let prefix = &bytes[..byte_offset.min(bytes.len())];
    let row = prefix.iter().filter(|b| **b == b'\n').count();
    let column = match prefix.iter().rposition(|b| *b == b'\n') {
        Some(newline) => prefix.len() - newline - 1,
        None => prefix.len(),
    };
    Point { row, column }
}
