//! Per-file diagnostic slots
//!
//! Each file owns one slot per [`Channel`]. A slot holds the last complete
//! list a channel reported for that file plus the trigger sequence of that
//! report. Slots are replaced wholesale, and never by a report with a lower
//! sequence than the one already stored. A removed file remembers the
//! sequence it was removed at, so reports of runs started before the removal
//! cannot bring it back.

use std::collections::BTreeMap;

use super::aggregator::{ChannelReport, FileDiagnostics};
use super::{Channel, Diagnostic};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub sequence: u64,
    pub diagnostics: Vec<Diagnostic>,
}

/// The latest diagnostics of every channel for every file
#[derive(Debug, Default)]
pub struct DiagnosticsState {
    files: BTreeMap<String, [Option<Slot>; 3]>,
    removed: BTreeMap<String, u64>,
}

impl DiagnosticsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a report, returning how many file slots it replaced
    ///
    /// Per file, a report older than the stored slot is discarded, and so
    /// is a report no newer than the file's removal.
    pub fn apply(&mut self, report: &ChannelReport) -> usize {
        let mut applied = 0;
        for (uri, diagnostics) in &report.files {
            if let Some(&removed_at) = self.removed.get(uri) {
                if report.sequence <= removed_at {
                    continue;
                }
                self.removed.remove(uri);
            }
            let slots = self.files.entry(uri.clone()).or_default();
            let slot = &mut slots[report.channel.index()];
            if slot.as_ref().is_some_and(|s| s.sequence > report.sequence) {
                continue;
            }
            *slot = Some(Slot {
                sequence: report.sequence,
                diagnostics: diagnostics.clone(),
            });
            applied += 1;
        }
        applied
    }

    /// Drop every slot of a file removed at `sequence`
    pub fn remove_file(&mut self, uri: &str, sequence: u64) -> bool {
        let removed_at = self.removed.entry(uri.to_string()).or_insert(sequence);
        *removed_at = (*removed_at).max(sequence);
        self.files.remove(uri).is_some()
    }

    pub fn slot(&self, uri: &str, channel: Channel) -> Option<&Slot> {
        self.files.get(uri)?[channel.index()].as_ref()
    }

    /// Linter ++ syntax ++ compiler for one file
    pub fn merged_for(&self, uri: &str) -> Option<Vec<Diagnostic>> {
        self.files.get(uri).map(merge)
    }

    /// Merged list of every file with at least one populated slot, by uri
    pub fn merged(&self) -> Vec<FileDiagnostics> {
        self.files
            .iter()
            .filter(|(_, slots)| slots.iter().any(Option::is_some))
            .map(|(uri, slots)| FileDiagnostics {
                uri: uri.clone(),
                diagnostics: merge(slots),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn merge(slots: &[Option<Slot>; 3]) -> Vec<Diagnostic> {
    Channel::ALL
        .iter()
        .filter_map(|c| slots[c.index()].as_ref())
        .flat_map(|s| s.diagnostics.iter().cloned())
        .collect()
}
