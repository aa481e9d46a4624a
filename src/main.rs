//! elm-intel CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use elm_intel::cli::Commands;
use elm_intel::commands::{
    run_definition, run_diagnostics, run_hover, run_modules, run_roots, CommandContext,
};
use elm_intel::workspace::find_root;
use elm_intel::{Cli, EngineConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli).await {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Logs go to stderr so piped output stays clean
///
/// `RUST_LOG` wins over `--verbose`, which wins over `[logging] level` of
/// the project around the current directory.
fn init_logging(verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        configured_level().unwrap_or_else(|| "info".to_string())
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("elm_intel={}", level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn configured_level() -> Option<String> {
    let cwd = std::env::current_dir().ok()?;
    let root = find_root(&cwd)?;
    EngineConfig::load(&root).ok().map(|config| config.logging.level)
}

async fn run(cli: &Cli) -> elm_intel::Result<String> {
    let ctx = CommandContext::from_cli(cli.format, cli.verbose).with_settings_file(cli.settings.as_deref())?;

    match &cli.command {
        Commands::Roots(args) => run_roots(args, &ctx),
        Commands::Modules(args) => run_modules(args, &ctx),
        Commands::Definition(args) => run_definition(args, &ctx),
        Commands::Hover(args) => run_hover(args, &ctx),
        Commands::Diagnostics(args) => run_diagnostics(args, &ctx).await,
    }
}
