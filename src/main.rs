//! Distill - durable transform cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use distill::cli::{Cli, Commands};
use distill::config::{Config, ConfigManager};
use distill::error::DistillResult;
use distill::ui::{self, UiContext};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DistillResult<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions(ref args) = cli.command {
        return distill::cli::commands::completions(args);
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());

    if UiContext::detect().is_interactive() {
        ui::init_theme();
    }

    if let Commands::Config(args) = cli.command {
        return distill::cli::commands::config(args, &config, &config_manager).await;
    }

    ConfigManager::ensure_state_dirs(&config).await?;

    match cli.command {
        Commands::Transform(args) => distill::cli::commands::transform(args, &config).await,
        Commands::Get(args) => distill::cli::commands::get(args, &config).await,
        Commands::Engines(args) => distill::cli::commands::engines(args, &config).await,
        Commands::Cache(args) => distill::cli::commands::cache(args, &config).await,
        Commands::Config(_) | Commands::Completions(_) => unreachable!("handled above"),
    }
}

/// Install the tracing subscriber: 0 = warn, 1 = info, 2+ = debug
///
/// Logs go to stderr so `get` output stays pipeable.
fn init_logging(verbose: u8, config: &Config) {
    let level = if verbose == 0 && config.general.verbose {
        1
    } else {
        verbose
    };
    let filter = match level {
        0 => EnvFilter::new("distill=warn"),
        1 => EnvFilter::new("distill=info"),
        _ => EnvFilter::new("distill=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
