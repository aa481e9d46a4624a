//! The aggregator task
//!
//! Owns the [`DiagnosticsState`]. Producers hold an [`AggregatorHandle`]
//! (a cloneable mpsc sender); the task applies reports in arrival order and
//! sends a full [`Publication`] after every accepted report.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::state::DiagnosticsState;
use super::{Channel, Diagnostic};

/// Complete lists from one channel run, keyed by uri
#[derive(Debug, Clone)]
pub struct ChannelReport {
    pub channel: Channel,
    pub sequence: u64,
    pub files: BTreeMap<String, Vec<Diagnostic>>,
}

impl ChannelReport {
    pub fn new(channel: Channel, sequence: u64) -> Self {
        Self {
            channel,
            sequence,
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, uri: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        self.files.insert(uri.into(), diagnostics);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiagnostics {
    pub uri: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// The full merged table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub files: Vec<FileDiagnostics>,
    /// Files dropped since the last publication; their diagnostics are now empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cleared: Vec<String>,
}

impl Publication {
    pub fn get(&self, uri: &str) -> Option<&[Diagnostic]> {
        self.files
            .iter()
            .find(|f| f.uri == uri)
            .map(|f| f.diagnostics.as_slice())
    }

    pub fn total(&self) -> usize {
        self.files.iter().map(|f| f.diagnostics.len()).sum()
    }
}

#[derive(Debug)]
pub enum AggregatorMessage {
    Report(ChannelReport),
    /// The file left the forest at this sequence
    Forget { uri: String, sequence: u64 },
    /// Reply with the current table without publishing
    Snapshot(oneshot::Sender<Publication>),
}

/// Sending side of the aggregator
#[derive(Debug, Clone)]
pub struct AggregatorHandle {
    tx: mpsc::UnboundedSender<AggregatorMessage>,
}

impl AggregatorHandle {
    pub fn report(&self, report: ChannelReport) {
        if self.tx.send(AggregatorMessage::Report(report)).is_err() {
            warn!("aggregator stopped, dropping report");
        }
    }

    /// Drop a file; reports sequenced at or before `sequence` are ignored for it
    pub fn forget(&self, uri: impl Into<String>, sequence: u64) {
        let _ = self.tx.send(AggregatorMessage::Forget {
            uri: uri.into(),
            sequence,
        });
    }

    /// The current merged table, after every message sent before this call
    pub async fn current(&self) -> Publication {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(AggregatorMessage::Snapshot(reply)).is_err() {
            return Publication::default();
        }
        rx.await.unwrap_or_default()
    }
}

/// Start the aggregator on the current tokio runtime
///
/// The task ends when every handle has been dropped.
pub fn spawn(publish: mpsc::UnboundedSender<Publication>) -> (AggregatorHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(rx, publish));
    (AggregatorHandle { tx }, task)
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<AggregatorMessage>,
    publish: mpsc::UnboundedSender<Publication>,
) {
    let mut state = DiagnosticsState::new();
    while let Some(message) = rx.recv().await {
        match message {
            AggregatorMessage::Report(report) => {
                let applied = state.apply(&report);
                debug!(
                    channel = ?report.channel,
                    sequence = report.sequence,
                    files = report.files.len(),
                    applied,
                    "report"
                );
                if applied > 0 {
                    let _ = publish.send(Publication {
                        files: state.merged(),
                        cleared: Vec::new(),
                    });
                }
            }
            AggregatorMessage::Forget { uri, sequence } => {
                if state.remove_file(&uri, sequence) {
                    let _ = publish.send(Publication {
                        files: state.merged(),
                        cleared: vec![uri],
                    });
                }
            }
            AggregatorMessage::Snapshot(reply) => {
                let _ = reply.send(Publication {
                    files: state.merged(),
                    cleared: Vec::new(),
                });
            }
        }
    }
    debug!("aggregator stopped");
}
