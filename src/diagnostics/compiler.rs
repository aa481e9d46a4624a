//! Compiler channel: `elm make --report=json`
//!
//! Each trigger waits out a debounce window; if a newer trigger arrived in
//! the meantime the older one is dropped. The compiler writes its JSON
//! report to stderr in one of three shapes:
//!
//! - `{"type": "compile-errors", "errors": [{"path", "problems": [...]}]}` (0.19)
//! - `{"type": "error", "path", "title", "message"}` (0.19, project-level)
//! - `[{"tag", "overview", "details", "region", "type", "file"}]` (0.18)
//!
//! Compiler regions are 1-based. Each of the four values is converted on
//! its own: 0 stays 0, anything else is decremented.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lsp_types::{Position, Range};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::aggregator::{AggregatorHandle, ChannelReport};
use super::process::ToolCommand;
use super::{Channel, Diagnostic, Severity};
use crate::document::{path_from_uri, uri_from_path};
use crate::error::{EngineError, Result};

static ANSI_ESCAPE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\x1b?\[\d+m").ok());

/// 1-based compiler coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Region {
    pub(super) fn from_json(region: Option<&Value>) -> Self {
        let get = |edge: &str, key: &str| {
            region
                .and_then(|r| r.get(edge))
                .and_then(|e| e.get(key))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32
        };
        Self {
            start_line: get("start", "line"),
            start_column: get("start", "column"),
            end_line: get("end", "line"),
            end_column: get("end", "column"),
        }
    }

    pub fn to_range(self) -> Range {
        Range::new(
            Position::new(convert(self.start_line), convert(self.start_column)),
            Position::new(convert(self.end_line), convert(self.end_column)),
        )
    }
}

/// 0 stays 0, otherwise subtract one
pub fn convert(value: u32) -> u32 {
    value.saturating_sub(1)
}

/// One problem from a compiler report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerIssue {
    /// As printed by the compiler, usually relative to the root
    pub path: Option<String>,
    pub title: String,
    pub details: String,
    pub severity: String,
    pub region: Region,
}

impl CompilerIssue {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(
            Channel::Compiler,
            self.region.to_range(),
            Severity::from_tool(&self.severity),
            format!("{} - {}", self.title, strip_ansi(&self.details)),
        )
    }
}

pub fn strip_ansi(text: &str) -> String {
    match ANSI_ESCAPE.as_ref() {
        Some(re) => re.replace_all(text, "").to_string(),
        None => text.to_string(),
    }
}

/// Parse the compiler's JSON report; empty output means a clean build
pub fn parse_report(output: &str) -> std::result::Result<Vec<CompilerIssue>, String> {
    let output = output.trim();
    if output.is_empty() {
        return Ok(Vec::new());
    }
    let report: Value = serde_json::from_str(output).map_err(|e| e.to_string())?;

    if let Some(issues) = report.as_array() {
        return Ok(issues.iter().map(legacy_issue).collect());
    }

    match report.get("type").and_then(Value::as_str) {
        Some("compile-errors") => {
            let mut issues = Vec::new();
            for error in report
                .get("errors")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let path = error.get("path").and_then(Value::as_str).map(str::to_string);
                for problem in error
                    .get("problems")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                {
                    issues.push(CompilerIssue {
                        path: path.clone(),
                        title: text_field(problem, "title"),
                        details: message_text(problem.get("message")),
                        severity: "error".to_string(),
                        region: Region::from_json(problem.get("region")),
                    });
                }
            }
            Ok(issues)
        }
        Some("error") => Ok(vec![CompilerIssue {
            path: report.get("path").and_then(Value::as_str).map(str::to_string),
            title: text_field(&report, "title"),
            details: message_text(report.get("message")),
            severity: "error".to_string(),
            region: Region::default(),
        }]),
        other => Err(format!("unexpected report type {:?}", other)),
    }
}

fn legacy_issue(issue: &Value) -> CompilerIssue {
    CompilerIssue {
        path: issue.get("file").and_then(Value::as_str).map(str::to_string),
        title: text_field(issue, "overview"),
        details: text_field(issue, "details"),
        severity: text_field(issue, "type"),
        region: Region::from_json(issue.get("region")),
    }
}

fn text_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// Flatten a 0.19 message: plain strings and styled `{"string": ...}` chunks
fn message_text(message: Option<&Value>) -> String {
    match message {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .map(|part| match part {
                Value::String(s) => s.as_str(),
                other => other.get("string").and_then(Value::as_str).unwrap_or(""),
            })
            .collect(),
        _ => String::new(),
    }
}

/// Group issues by file uri; project-level issues land on `elm.json`
pub fn diagnostics_by_uri(root: &Path, issues: &[CompilerIssue]) -> BTreeMap<String, Vec<Diagnostic>> {
    let mut by_uri: BTreeMap<String, Vec<Diagnostic>> = BTreeMap::new();
    for issue in issues {
        let path = match &issue.path {
            Some(p) if Path::new(p).is_absolute() => PathBuf::from(p),
            Some(p) => root.join(p),
            None => root.join("elm.json"),
        };
        by_uri
            .entry(uri_from_path(&path))
            .or_default()
            .push(issue.to_diagnostic());
    }
    by_uri
}

// ============================================================================
// Channel
// ============================================================================

/// Debounced compiler runs for one root
#[derive(Debug, Clone)]
pub struct CompilerChannel {
    root: PathBuf,
    program: PathBuf,
    debounce: Duration,
    aggregator: AggregatorHandle,
    latest: Arc<AtomicU64>,
    /// Files of triggers still inside their debounce window
    pending: Arc<Mutex<BTreeSet<PathBuf>>>,
    /// Uris with diagnostics in the last report
    flagged: Arc<Mutex<BTreeSet<String>>>,
}

impl CompilerChannel {
    pub fn new(root: &Path, program: PathBuf, debounce: Duration, aggregator: AggregatorHandle) -> Self {
        Self {
            root: root.to_path_buf(),
            program,
            debounce,
            aggregator,
            latest: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(Mutex::new(BTreeSet::new())),
            flagged: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// Compile `file` after the debounce window unless superseded
    ///
    /// A superseded trigger hands its file to the newer one.
    pub fn trigger(&self, sequence: u64, file: PathBuf) {
        self.latest.fetch_max(sequence, Ordering::SeqCst);
        self.pending.lock().insert(file);
        let channel = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(channel.debounce).await;
            if channel.latest.load(Ordering::SeqCst) != sequence {
                debug!(sequence, "compile coalesced into a newer trigger");
                return;
            }
            let files: Vec<PathBuf> = std::mem::take(&mut *channel.pending.lock()).into_iter().collect();
            if files.is_empty() {
                return;
            }
            channel.run(sequence, files).await;
        });
    }

    /// Stop reporting a deleted file
    pub fn forget(&self, uri: &str) {
        self.flagged.lock().remove(uri);
        if let Some(path) = path_from_uri(uri) {
            let mut pending = self.pending.lock();
            pending.remove(&path);
            if let Ok(relative) = path.strip_prefix(&self.root) {
                pending.remove(relative);
            }
        }
    }

    /// Compile now and send the report
    pub async fn run(&self, sequence: u64, files: Vec<PathBuf>) {
        let compiled = match self.compile(&files).await {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!(error = %e, "compiler run failed");
                BTreeMap::new()
            }
        };

        let mut report = ChannelReport::new(Channel::Compiler, sequence);
        {
            let mut flagged = self.flagged.lock();
            for uri in flagged.iter() {
                report.files.insert(uri.clone(), Vec::new());
            }
            for file in &files {
                report.files.insert(uri_from_path(&self.absolute(file)), Vec::new());
            }
            *flagged = compiled
                .iter()
                .filter(|(_, d)| !d.is_empty())
                .map(|(uri, _)| uri.clone())
                .collect();
        }
        report.files.extend(compiled);
        self.aggregator.report(report);
    }

    /// Run the compiler once and group its issues by uri
    pub async fn compile(&self, files: &[PathBuf]) -> Result<BTreeMap<String, Vec<Diagnostic>>> {
        let output = ToolCommand::new(&self.program, &self.root)
            .arg("make")
            .args(files.iter().map(|f| f.to_string_lossy().to_string()))
            .args(["--report=json", "--output=/dev/null"])
            .run()
            .await?;

        let report = if output.stderr.trim().is_empty() {
            &output.stdout
        } else {
            &output.stderr
        };
        let issues = match parse_report(report) {
            Ok(issues) => issues,
            Err(message) if output.success() => {
                debug!(%message, "ignoring non-JSON output of a successful build");
                Vec::new()
            }
            Err(message) => {
                return Err(EngineError::Tool {
                    program: self.program.to_string_lossy().to_string(),
                    message: format!("unreadable report: {}", message),
                })
            }
        };
        debug!(issues = issues.len(), "compiled");
        Ok(diagnostics_by_uri(&self.root, &issues))
    }

    fn absolute(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.root.join(file)
        }
    }
}
