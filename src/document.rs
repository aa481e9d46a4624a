//! Document text, uris, and coordinate translation
//!
//! Trees use (row, byte column) points. The editor protocol uses
//! (line, UTF-16 code unit) positions. [`LineIndex`] converts between the
//! two for a given text; everything that crosses the editor boundary goes
//! through it.

use std::path::{Path, PathBuf};

use lsp_types::{Position, Range, TextDocumentContentChangeEvent};
use url::Url;

use crate::syntax::{Point, Span};

// ============================================================================
// Uris
// ============================================================================

/// `file://` uri for a path; relative paths are taken from the current directory
pub fn uri_from_path(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::path::absolute(path).unwrap_or_else(|_| Path::new("/").join(path))
    };
    match Url::from_file_path(&absolute) {
        Ok(url) => url.to_string(),
        Err(()) => format!("file://{}", absolute.display()),
    }
}

/// Filesystem path of a `file://` uri; `None` for other schemes and remote hosts
pub fn path_from_uri(uri: &str) -> Option<PathBuf> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}

// ============================================================================
// Coordinates
// ============================================================================

/// Line start offsets of a text
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of a line without its terminator
    pub fn line<'a>(&self, text: &'a str, line: usize) -> Option<&'a str> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(text.len());
        let slice = text.get(start..end)?;
        Some(slice.strip_suffix('\r').unwrap_or(slice))
    }

    /// Byte offset of a protocol position, clamped to the text
    pub fn offset(&self, text: &str, position: Position) -> usize {
        let line = position.line as usize;
        let Some(line_text) = self.line(text, line) else {
            return text.len();
        };
        let start = self.line_starts[line];
        start + utf16_to_byte(line_text, position.character as usize)
    }

    /// Tree point of a protocol position
    pub fn point(&self, text: &str, position: Position) -> Point {
        let line = position.line as usize;
        match self.line(text, line) {
            Some(line_text) => Point::new(line, utf16_to_byte(line_text, position.character as usize)),
            None => {
                let last = self.line_count() - 1;
                let width = self.line(text, last).map(str::len).unwrap_or(0);
                Point::new(last, width)
            }
        }
    }

    /// Protocol position of a tree point
    pub fn position(&self, text: &str, point: Point) -> Position {
        match self.line(text, point.row) {
            Some(line_text) => {
                let mut column = point.column.min(line_text.len());
                while !line_text.is_char_boundary(column) {
                    column -= 1;
                }
                let character: usize = line_text[..column].chars().map(char::len_utf16).sum();
                Position::new(point.row as u32, character as u32)
            }
            None => {
                let last = self.line_count() - 1;
                let width: usize = self
                    .line(text, last)
                    .map(|l| l.chars().map(char::len_utf16).sum())
                    .unwrap_or(0);
                Position::new(last as u32, width as u32)
            }
        }
    }

    pub fn range(&self, text: &str, span: &Span) -> Range {
        Range::new(self.position(text, span.start), self.position(text, span.end))
    }

    /// Clamp a protocol range so both ends lie inside the text
    pub fn clamp(&self, text: &str, range: Range) -> Range {
        let clamp_one = |p: Position| self.position(text, self.point(text, p));
        Range::new(clamp_one(range.start), clamp_one(range.end))
    }
}

fn utf16_to_byte(line: &str, character: usize) -> usize {
    let mut units = 0;
    for (offset, ch) in line.char_indices() {
        if units >= character {
            return offset;
        }
        units += ch.len_utf16();
    }
    line.len()
}

// ============================================================================
// Documents
// ============================================================================

/// One content change: whole-text when `range` is `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub range: Option<Range>,
    pub text: String,
}

impl TextChange {
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }

    pub fn ranged(range: Range, text: impl Into<String>) -> Self {
        Self {
            range: Some(range),
            text: text.into(),
        }
    }
}

impl From<TextDocumentContentChangeEvent> for TextChange {
    fn from(event: TextDocumentContentChangeEvent) -> Self {
        Self {
            range: event.range,
            text: event.text,
        }
    }
}

/// Apply changes in order to a text
pub fn apply_changes(text: &str, changes: &[TextChange]) -> String {
    let mut current = text.to_string();
    for change in changes {
        match change.range {
            None => current = change.text.clone(),
            Some(range) => {
                let index = LineIndex::new(&current);
                let start = index.offset(&current, range.start);
                let end = index.offset(&current, range.end).max(start);
                current.replace_range(start..end, &change.text);
            }
        }
    }
    current
}
