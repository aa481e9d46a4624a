//! Roots command handler - elm.json discovery

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::{OutputFormat, RootsArgs};
use crate::commands::{to_json, CommandContext};
use crate::error::{EngineError, Result};
use crate::workspace::{discover_roots, Manifest};

#[derive(Debug, Serialize)]
struct RootEntry {
    root: PathBuf,
    source_directories: Vec<PathBuf>,
    /// Manifest problem, if the root cannot be opened
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run_roots(args: &RootsArgs, ctx: &CommandContext) -> Result<String> {
    let path = match &args.path {
        Some(p) => p.clone(),
        None => std::env::current_dir().map_err(|e| EngineError::FileNotFound {
            path: format!("current directory: {}", e),
        })?,
    };
    if !path.is_dir() {
        return Err(EngineError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let entries: Vec<RootEntry> = discover_roots(&path)
        .into_iter()
        .map(|root| match Manifest::load(&root) {
            Ok(manifest) => RootEntry {
                source_directories: manifest.source_dirs(&root),
                root,
                error: None,
            },
            Err(e) => RootEntry {
                root,
                source_directories: Vec::new(),
                error: Some(e.to_string()),
            },
        })
        .collect();

    match ctx.format {
        OutputFormat::Json => to_json(&entries),
        OutputFormat::Text => {
            let mut output = String::new();
            for entry in &entries {
                output.push_str(&entry.root.display().to_string());
                if let Some(error) = &entry.error {
                    output.push_str(&format!("  ({})", error));
                }
                output.push('\n');
                if ctx.verbose {
                    for dir in &entry.source_directories {
                        output.push_str(&format!("  {}\n", dir.display()));
                    }
                }
            }
            if entries.is_empty() {
                output.push_str("No elm.json found\n");
            }
            Ok(output)
        }
    }
}
