//! Hover hints built from declarations
//!
//! A module declaration is documented by the doc comment that follows it.
//! Any other declaration is documented by the type annotation right before
//! it and the doc comment before that.

use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// Markdown hint for a definition node, `None` when there is nothing to show
pub fn hint_for(tree: &SyntaxTree, node: NodeId) -> Option<String> {
    let (annotation, comment) = match tree.kind(node) {
        NodeKind::ModuleDeclaration => {
            let comment = tree
                .next_sibling(node)
                .filter(|s| tree.kind(*s) == NodeKind::BlockComment)
                .map(|s| tree.text(s));
            (None, comment)
        }
        _ => match tree.previous_sibling(node) {
            Some(prev) if tree.kind(prev) == NodeKind::TypeAnnotation => {
                let comment = tree
                    .previous_sibling(prev)
                    .filter(|s| tree.kind(*s) == NodeKind::BlockComment)
                    .map(|s| tree.text(s));
                (Some(tree.text(prev)), comment)
            }
            Some(prev) if tree.kind(prev) == NodeKind::BlockComment => (None, Some(tree.text(prev))),
            _ => (None, None),
        },
    };
    let hint = format_hint(annotation, comment);
    (!hint.is_empty()).then_some(hint)
}

fn format_hint(annotation: Option<&str>, comment: Option<&str>) -> String {
    let mut value = String::new();
    if let Some(annotation) = annotation.filter(|a| !a.is_empty()) {
        value.push_str(&format!("\n```elm\n{}\n```\n", annotation));
    }
    if let Some(comment) = comment.filter(|c| !c.is_empty()) {
        if !value.is_empty() {
            value.push_str("\n\n---\n\n");
        }
        value.push_str(strip_comment(comment));
    }
    value
}

/// Remove `{-|`, `{-` and `-}` delimiters
pub fn strip_comment(comment: &str) -> &str {
    let mut inner = comment;
    if let Some(rest) = inner.strip_prefix("{-|") {
        inner = rest;
    }
    if let Some(rest) = inner.strip_prefix("{-") {
        inner = rest;
    }
    if let Some(rest) = inner.strip_suffix("-}") {
        inner = rest;
    }
    inner.trim()
}
