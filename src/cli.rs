//! CLI argument definitions using clap with subcommand architecture
//!
//! Every subcommand works on one project root in batch mode: the root is
//! loaded, the query is answered from a snapshot, and the result printed.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Definition lookup and diagnostics for Elm projects
#[derive(Parser, Debug)]
#[command(name = "elm-intel")]
#[command(about = "Go-to-definition, hover hints and merged diagnostics for Elm projects")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Editor settings JSON (an `elmLS` object or the section itself),
    /// merged over each root's configuration
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,
}

// ============================================
// Main Commands Enum
// ============================================

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every directory holding an elm.json
    Roots(RootsArgs),

    /// List the modules of a root and the files declaring them
    #[command(visible_alias = "m")]
    Modules(ModulesArgs),

    /// Find the definition of the name at a position
    #[command(visible_alias = "def")]
    Definition(PositionArgs),

    /// Show the hover hint of the name at a position
    Hover(PositionArgs),

    /// Run the syntax, compiler and linter channels over a root
    #[command(visible_alias = "d")]
    Diagnostics(DiagnosticsArgs),
}

#[derive(Args, Debug)]
pub struct RootsArgs {
    /// Directory to search (defaults to the current directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ModulesArgs {
    /// Project root (defaults to the nearest elm.json above the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Only show module names declared by more than one file
    #[arg(long)]
    pub duplicates: bool,
}

/// A file and a 0-based editor position inside it
#[derive(Args, Debug)]
pub struct PositionArgs {
    /// Elm source file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// 0-based line
    #[arg(short, long)]
    pub line: u32,

    /// 0-based UTF-16 character offset within the line
    #[arg(short, long)]
    pub character: u32,
}

#[derive(Args, Debug)]
pub struct DiagnosticsArgs {
    /// Project root (defaults to the nearest elm.json above the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Skip `elm make`
    #[arg(long)]
    pub no_compiler: bool,

    /// Skip the linter
    #[arg(long)]
    pub no_linter: bool,

    /// Print `textDocument/publishDiagnostics` params, one JSON object per line
    #[arg(long)]
    pub lsp: bool,
}

// ============================================
// Shared Types
// ============================================

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    #[value(alias = "pretty")]
    Text,
    /// JSON - standard JSON output for machine parsing
    Json,
}
