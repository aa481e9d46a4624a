//! Modules command handler - the module table of a root

use serde::Serialize;

use crate::cli::{ModulesArgs, OutputFormat};
use crate::commands::{load_workspace, offline, project_root, to_json, CommandContext};
use crate::error::Result;
use crate::module_table::ModuleRecord;

#[derive(Debug, Serialize)]
struct ModuleEntry<'a> {
    name: &'a str,
    uris: &'a [String],
    /// Written imports, default imports excluded
    #[serde(skip_serializing_if = "Vec::is_empty")]
    imports: Vec<&'a str>,
}

pub fn run_modules(args: &ModulesArgs, ctx: &CommandContext) -> Result<String> {
    let root = project_root(args.root.as_deref())?;
    let (workspace, _publications) = load_workspace(&root, offline, ctx)?;
    let snapshot = workspace.snapshot();
    let modules = snapshot.modules();

    let entries: Vec<ModuleEntry> = modules
        .iter()
        .filter(|(_, uris)| !args.duplicates || uris.len() > 1)
        .map(|(name, uris)| ModuleEntry {
            name,
            uris,
            imports: uris
                .first()
                .and_then(|uri| snapshot.get(uri))
                .map(|file| written_imports(&file.module))
                .unwrap_or_default(),
        })
        .collect();

    match ctx.format {
        OutputFormat::Json => to_json(&entries),
        OutputFormat::Text => {
            let mut output = String::new();
            for entry in &entries {
                if entry.uris.len() > 1 {
                    output.push_str(&format!("{}  (declared {} times)\n", entry.name, entry.uris.len()));
                } else {
                    output.push_str(&format!("{}\n", entry.name));
                }
                for uri in entry.uris {
                    output.push_str(&format!("  {}\n", uri));
                }
                if ctx.verbose && !entry.imports.is_empty() {
                    output.push_str(&format!("  imports: {}\n", entry.imports.join(", ")));
                }
            }
            output.push_str(&format!(
                "{} modules, {} duplicated\n",
                modules.len(),
                modules.duplicates().len()
            ));
            Ok(output)
        }
    }
}

fn written_imports(record: &ModuleRecord) -> Vec<&str> {
    record.written_imports().map(|i| i.module.as_str()).collect()
}
