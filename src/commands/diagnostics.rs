//! Diagnostics command handler - every channel over one root

use serde::Serialize;

use crate::cli::{DiagnosticsArgs, OutputFormat};
use crate::commands::{load_workspace, project_root, to_json, CommandContext};
use crate::diagnostics::{Publication, Severity};
use crate::document::path_from_uri;
use crate::error::{EngineError, Result};
use crate::protocol::to_publish_params;

#[derive(Debug, Serialize)]
struct Summary {
    files: usize,
    errors: usize,
    warnings: usize,
    compiler: bool,
    linter: bool,
}

#[derive(Debug, Serialize)]
struct DiagnosticsOutput<'a> {
    summary: Summary,
    #[serde(flatten)]
    publication: &'a Publication,
}

pub async fn run_diagnostics(args: &DiagnosticsArgs, ctx: &CommandContext) -> Result<String> {
    let root = project_root(args.root.as_deref())?;
    let (workspace, _publications) = load_workspace(
        &root,
        |config| {
            if args.no_compiler {
                config.compiler.enabled = false;
            }
            if args.no_linter {
                config.linter.enabled = false;
            }
        },
        ctx,
    )?;

    let publication = workspace.diagnose_all().await;
    let count = |severity: Severity| {
        publication
            .files
            .iter()
            .flat_map(|f| f.diagnostics.iter())
            .filter(|d| d.severity == severity)
            .count()
    };
    let summary = Summary {
        files: publication.files.iter().filter(|f| !f.diagnostics.is_empty()).count(),
        errors: count(Severity::Error),
        warnings: count(Severity::Warning),
        compiler: workspace.has_compiler(),
        linter: workspace.has_linter(),
    };

    if args.lsp {
        let mut output = String::new();
        for params in to_publish_params(&publication)? {
            let line = serde_json::to_string(&params).map_err(|e| EngineError::ConfigError {
                message: format!("JSON serialization failed: {}", e),
            })?;
            output.push_str(&line);
            output.push('\n');
        }
        return Ok(output);
    }

    match ctx.format {
        OutputFormat::Json => to_json(&DiagnosticsOutput {
            summary,
            publication: &publication,
        }),
        OutputFormat::Text => {
            let mut output = String::new();
            for file in publication.files.iter().filter(|f| !f.diagnostics.is_empty()) {
                let path = path_from_uri(&file.uri)
                    .map(|p| {
                        p.strip_prefix(&root)
                            .map(|rel| rel.display().to_string())
                            .unwrap_or_else(|_| p.display().to_string())
                    })
                    .unwrap_or_else(|| file.uri.clone());
                for d in &file.diagnostics {
                    output.push_str(&format!(
                        "{}:{}:{}: {} [{}] {}\n",
                        path,
                        d.range.start.line + 1,
                        d.range.start.character + 1,
                        d.severity.as_str(),
                        d.source,
                        d.message
                    ));
                }
            }
            output.push_str(&format!(
                "{} errors, {} warnings in {} files",
                summary.errors, summary.warnings, summary.files
            ));
            let skipped: Vec<&str> = [
                (!summary.compiler).then_some("compiler"),
                (!summary.linter).then_some("linter"),
            ]
            .into_iter()
            .flatten()
            .collect();
            if !skipped.is_empty() {
                output.push_str(&format!(" ({} not run)", skipped.join(", ")));
            }
            output.push('\n');
            Ok(output)
        }
    }
}
