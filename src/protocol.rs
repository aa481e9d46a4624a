//! Conversions to editor protocol types
//!
//! The engine keeps uris as strings internally; they are parsed into
//! [`lsp_types::Uri`] only here, at the boundary.

use std::str::FromStr;

use lsp_types::{
    DiagnosticSeverity, Hover, HoverContents, Location, MarkupContent, MarkupKind,
    PublishDiagnosticsParams, Uri,
};

use crate::definition::DefinitionLocation;
use crate::diagnostics::{Diagnostic, Publication, Severity};
use crate::error::{EngineError, Result};

pub fn parse_uri(uri: &str) -> Result<Uri> {
    Uri::from_str(uri).map_err(|_| EngineError::InvalidUri {
        uri: uri.to_string(),
    })
}

pub fn to_lsp_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    }
}

pub fn to_lsp_diagnostic(diagnostic: &Diagnostic) -> lsp_types::Diagnostic {
    lsp_types::Diagnostic {
        range: diagnostic.range,
        severity: Some(to_lsp_severity(diagnostic.severity)),
        source: Some(diagnostic.source.to_string()),
        message: diagnostic.message.clone(),
        ..Default::default()
    }
}

/// One notification per file, cleared files last with empty lists
pub fn to_publish_params(publication: &Publication) -> Result<Vec<PublishDiagnosticsParams>> {
    let mut params = Vec::with_capacity(publication.files.len() + publication.cleared.len());
    for file in &publication.files {
        params.push(PublishDiagnosticsParams {
            uri: parse_uri(&file.uri)?,
            diagnostics: file.diagnostics.iter().map(to_lsp_diagnostic).collect(),
            version: None,
        });
    }
    for uri in &publication.cleared {
        params.push(PublishDiagnosticsParams {
            uri: parse_uri(uri)?,
            diagnostics: Vec::new(),
            version: None,
        });
    }
    Ok(params)
}

pub fn to_location(location: &DefinitionLocation) -> Result<Location> {
    Ok(Location {
        uri: parse_uri(&location.uri)?,
        range: location.range,
    })
}

pub fn to_hover(markdown: String) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: markdown,
        }),
        range: None,
    }
}
