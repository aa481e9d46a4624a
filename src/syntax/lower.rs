//! Lowering of tree-sitter trees into the arena representation

use tree_sitter::{Node, Tree};

use super::{NodeId, NodeKind, Span, SyntaxNode, SyntaxTree};

/// Copy the named structure of a tree-sitter tree into a [`SyntaxTree`]
///
/// The walk is iterative so deeply nested expressions cannot overflow the
/// stack.
pub fn lower(tree: &Tree, source: String) -> SyntaxTree {
    let mut nodes: Vec<SyntaxNode> = Vec::new();
    let mut cursor = tree.walk();
    let mut depth = 0usize;
    // Included ancestors of the cursor position as (depth, id)
    let mut open: Vec<(usize, NodeId)> = Vec::new();

    'walk: loop {
        let node = cursor.node();
        while matches!(open.last(), Some((d, _)) if *d >= depth) {
            open.pop();
        }

        if depth == 0 || is_kept(&node) {
            let id = NodeId::from_index(nodes.len());
            let parent = open.last().map(|(_, p)| *p);
            nodes.push(SyntaxNode {
                kind: kind_of(&node),
                grammar_kind: node.kind(),
                span: span_of(&node),
                parent,
                children: Vec::new(),
            });
            if let Some(p) = parent {
                nodes[p.index()].children.push(id);
            }
            open.push((depth, id));
        }

        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
            depth -= 1;
        }
    }

    SyntaxTree::from_parts(source, nodes)
}

fn is_kept(node: &Node) -> bool {
    node.is_named() || node.is_missing()
}

fn kind_of(node: &Node) -> NodeKind {
    if node.is_missing() {
        NodeKind::Missing
    } else if node.is_error() {
        NodeKind::Error
    } else {
        NodeKind::from_grammar(node.kind())
    }
}

fn span_of(node: &Node) -> Span {
    Span {
        start: node.start_position().into(),
        end: node.end_position().into(),
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
    }
}
