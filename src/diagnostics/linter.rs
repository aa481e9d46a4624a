//! Linter channel: `elm-review --report=json` by default
//!
//! The channel keeps its own copy of every open file's text, updated on
//! each edit independently of the forest, and clamps reported ranges to
//! that text. Two modes:
//!
//! - project mode (default): one run in the root, errors grouped by path
//! - stdin mode: one run per triggered file with its text on stdin; every
//!   reported error belongs to that file

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use super::aggregator::{AggregatorHandle, ChannelReport};
use super::compiler::Region;
use super::process::ToolCommand;
use super::{Channel, Diagnostic, Severity};
use crate::document::{path_from_uri, uri_from_path, LineIndex};
use crate::error::{EngineError, Result};

/// One error from a linter report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub path: Option<String>,
    pub rule: String,
    pub message: String,
    pub region: Region,
}

impl LintIssue {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = if self.rule.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.rule, self.message)
        };
        Diagnostic::new(Channel::Linter, self.region.to_range(), Severity::Warning, message)
    }
}

/// Parse an elm-review JSON report
pub fn parse_report(output: &str) -> std::result::Result<Vec<LintIssue>, String> {
    let output = output.trim();
    if output.is_empty() {
        return Ok(Vec::new());
    }
    let report: Value = serde_json::from_str(output).map_err(|e| e.to_string())?;
    match report.get("type").and_then(Value::as_str) {
        Some("review-errors") => {
            let mut issues = Vec::new();
            for file in report
                .get("errors")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let path = file.get("path").and_then(Value::as_str).map(str::to_string);
                for error in file
                    .get("errors")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                {
                    if error.get("suppressed").and_then(Value::as_bool) == Some(true) {
                        continue;
                    }
                    issues.push(LintIssue {
                        path: path.clone(),
                        rule: error
                            .get("rule")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string(),
                        message: error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string(),
                        region: Region::from_json(error.get("region")),
                    });
                }
            }
            Ok(issues)
        }
        Some("error") => Err(format!(
            "linter error: {}",
            report.get("title").and_then(Value::as_str).unwrap_or("unknown")
        )),
        other => Err(format!("unexpected report type {:?}", other)),
    }
}

/// Linter runs for one root
#[derive(Debug, Clone)]
pub struct LinterChannel {
    root: PathBuf,
    program: PathBuf,
    args: Vec<String>,
    stdin: bool,
    aggregator: AggregatorHandle,
    texts: Arc<Mutex<HashMap<String, String>>>,
    flagged: Arc<Mutex<BTreeSet<String>>>,
    /// Sequence of the newest project run already reported
    completed: Arc<AtomicU64>,
}

impl LinterChannel {
    pub fn new(root: &Path, program: PathBuf, args: Vec<String>, stdin: bool, aggregator: AggregatorHandle) -> Self {
        Self {
            root: root.to_path_buf(),
            program,
            args,
            stdin,
            aggregator,
            texts: Arc::new(Mutex::new(HashMap::new())),
            flagged: Arc::new(Mutex::new(BTreeSet::new())),
            completed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn update_text(&self, uri: &str, text: &str) {
        self.texts.lock().insert(uri.to_string(), text.to_string());
    }

    pub fn forget_text(&self, uri: &str) {
        self.texts.lock().remove(uri);
        self.flagged.lock().remove(uri);
    }

    pub fn text_of(&self, uri: &str) -> Option<String> {
        self.texts.lock().get(uri).cloned()
    }

    /// Lint in the background
    pub fn trigger(&self, sequence: u64, uri: &str) {
        let channel = self.clone();
        let uri = uri.to_string();
        tokio::spawn(async move {
            channel.run(sequence, Some(&uri)).await;
        });
    }

    /// Lint now and send the report
    ///
    /// A project run covers every file, so one that finishes after a newer
    /// project run has been reported is dropped whole.
    pub async fn run(&self, sequence: u64, target: Option<&str>) {
        let linted = match self.lint(target).await {
            Ok(linted) => linted,
            Err(e) => {
                warn!(error = %e, "linter run failed");
                BTreeMap::new()
            }
        };

        let mut report = ChannelReport::new(Channel::Linter, sequence);
        // Held until the report is sent so project runs reach the aggregator in order
        let mut flagged = self.flagged.lock();
        if !self.stdin {
            let completed = self.completed.load(Ordering::SeqCst);
            if sequence < completed {
                debug!(sequence, completed, "dropping project lint overtaken by a newer run");
                return;
            }
            self.completed.store(sequence, Ordering::SeqCst);
        }
        // In stdin mode only the target's previous findings are replaced
        let stale: Vec<String> = match (self.stdin, target) {
            (true, Some(uri)) => flagged.iter().filter(|u| *u == uri).cloned().collect(),
            _ => flagged.iter().cloned().collect(),
        };
        for uri in stale {
            flagged.remove(&uri);
            report.files.insert(uri, Vec::new());
        }
        if let Some(uri) = target {
            report.files.insert(uri.to_string(), Vec::new());
        }
        flagged.extend(
            linted
                .iter()
                .filter(|(_, d)| !d.is_empty())
                .map(|(uri, _)| uri.clone()),
        );
        report.files.extend(linted);
        self.aggregator.report(report);
    }

    /// Run the linter once and group its findings by uri
    pub async fn lint(&self, target: Option<&str>) -> Result<BTreeMap<String, Vec<Diagnostic>>> {
        let mut command = ToolCommand::new(&self.program, &self.root).args(self.args.iter().cloned());
        if self.stdin {
            let Some(uri) = target else {
                return Ok(BTreeMap::new());
            };
            let text = match self.text_of(uri) {
                Some(text) => text,
                None => match path_from_uri(uri) {
                    Some(path) => std::fs::read_to_string(&path).map_err(|e| EngineError::io(path, e))?,
                    None => return Ok(BTreeMap::new()),
                },
            };
            command = command.stdin(text);
        }

        let output = command.run().await?;
        let issues = parse_report(&output.stdout).map_err(|message| EngineError::Tool {
            program: self.program.to_string_lossy().to_string(),
            message,
        })?;
        debug!(issues = issues.len(), "linted");

        let mut by_uri: BTreeMap<String, Vec<Diagnostic>> = BTreeMap::new();
        for issue in &issues {
            let uri = match (self.stdin, target, &issue.path) {
                (true, Some(uri), _) => uri.to_string(),
                (_, _, Some(path)) if Path::new(path).is_absolute() => uri_from_path(Path::new(path)),
                (_, _, Some(path)) => uri_from_path(&self.root.join(path)),
                (_, _, None) => continue,
            };
            let mut diagnostic = issue.to_diagnostic();
            if let Some(text) = self.text_of(&uri) {
                diagnostic.range = LineIndex::new(&text).clamp(&text, diagnostic.range);
            }
            by_uri.entry(uri).or_default().push(diagnostic);
        }
        Ok(by_uri)
    }
}
