//! Definition and hover command handlers

use std::path::Path;

use lsp_types::{Location, Position};
use serde::Serialize;

use crate::cli::{OutputFormat, PositionArgs};
use crate::commands::{absolute, load_workspace, offline, project_root, to_json, CommandContext};
use crate::document::{path_from_uri, uri_from_path};
use crate::error::{EngineError, Result};
use crate::protocol::{to_hover, to_location};
use crate::workspace::Workspace;

/// Load the root of `file` and make sure the file itself is in the forest
fn workspace_for(file: &Path, ctx: &CommandContext) -> Result<(Workspace, String)> {
    let file = absolute(file)?;
    let root = project_root(file.parent())?;
    let (workspace, _publications) = load_workspace(&root, offline, ctx)?;

    let uri = uri_from_path(&file);
    if workspace.snapshot().get(&uri).is_none() {
        // Outside the source directories: analyse it on its own terms
        let text = std::fs::read_to_string(&file).map_err(|e| EngineError::io(&file, e))?;
        workspace.open_document(&uri, text, 0)?;
    }
    Ok((workspace, uri))
}

/// An editor `Location` plus the local path of its uri
#[derive(Debug, Serialize)]
struct DefinitionOutput {
    #[serde(flatten)]
    location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

pub fn run_definition(args: &PositionArgs, ctx: &CommandContext) -> Result<String> {
    let (workspace, uri) = workspace_for(&args.file, ctx)?;
    let position = Position::new(args.line, args.character);
    let location = workspace.definition(&uri, position);

    match ctx.format {
        OutputFormat::Json => {
            let output = match location {
                Some(location) => Some(DefinitionOutput {
                    location: to_location(&location)?,
                    path: path_from_uri(&location.uri).map(|p| p.display().to_string()),
                }),
                None => None,
            };
            to_json(&output)
        }
        OutputFormat::Text => Ok(match location {
            Some(location) => {
                let target = path_from_uri(&location.uri)
                    .map(|p| p.display().to_string())
                    .unwrap_or(location.uri);
                let (start, end) = (location.range.start, location.range.end);
                format!(
                    "{}:{}:{}-{}:{}\n",
                    target, start.line, start.character, end.line, end.character
                )
            }
            None => "No definition found\n".to_string(),
        }),
    }
}

pub fn run_hover(args: &PositionArgs, ctx: &CommandContext) -> Result<String> {
    let (workspace, uri) = workspace_for(&args.file, ctx)?;
    let hint = workspace.hover(&uri, Position::new(args.line, args.character));

    match ctx.format {
        OutputFormat::Json => to_json(&hint.map(to_hover)),
        OutputFormat::Text => Ok(match hint {
            Some(hint) => format!("{}\n", hint.trim()),
            None => "No hover information\n".to_string(),
        }),
    }
}
