mod agents;
mod browsers;
mod cli;
mod error;
mod lockfile;
mod registry;
mod utils;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;
use workflow::UpdateOptions;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Update { package, no_diff } => workflow::execute_update(
            &cli.path,
            &UpdateOptions {
                package,
                show_diff: !no_diff,
            },
        ),
        Commands::Check { package } => workflow::execute_check(&cli.path, &package),
        Commands::Browsers => workflow::execute_browsers(&cli.path),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
