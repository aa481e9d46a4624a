//! Diagnostics from three independent channels
//!
//! ```text
//!  linter task ───┐
//!  syntax (inline)├── ChannelReport ──mpsc──> aggregator task ──> Publication
//!  compiler task ─┘                           (owns DiagnosticsState)
//! ```
//!
//! Every trigger (open, change, save) takes a sequence number. Each channel
//! reports complete per-file lists tagged with the sequence they were
//! computed for; the aggregator keeps the newest list per (file, channel)
//! and republishes the merged table after every accepted report.
//!
//! Channels never wait for each other. A published set may mix a fresh
//! syntax result with an older compiler result until the compiler catches
//! up.

pub mod aggregator;
pub mod compiler;
pub mod linter;
pub mod process;
pub mod state;
pub mod syntax;

pub use aggregator::{AggregatorHandle, AggregatorMessage, ChannelReport, FileDiagnostics, Publication};
pub use compiler::CompilerChannel;
pub use linter::LinterChannel;
pub use state::DiagnosticsState;
pub use syntax::SyntaxChannel;

use lsp_types::Range;
use serde::Serialize;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Map a tool's severity string; anything unknown is an error
    pub fn from_tool(value: &str) -> Self {
        match value {
            "warning" => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Diagnostic source, also the slot index inside a file's table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Linter = 0,
    Syntax = 1,
    Compiler = 2,
}

impl Channel {
    /// Merge order of published lists
    pub const ALL: [Channel; 3] = [Channel::Linter, Channel::Syntax, Channel::Compiler];

    pub fn index(self) -> usize {
        self as usize
    }

    /// `source` tag of diagnostics produced by this channel
    pub fn source(self) -> &'static str {
        match self {
            Channel::Linter => "elm-review",
            Channel::Syntax => "elm-intel",
            Channel::Compiler => "Elm",
        }
    }
}

/// One diagnostic, in protocol coordinates (0-based, half-open)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    pub message: String,
    pub source: String,
}

impl Diagnostic {
    pub fn new(channel: Channel, range: Range, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            range,
            severity,
            message: message.into(),
            source: channel.source().to_string(),
        }
    }
}
