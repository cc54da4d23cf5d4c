use clap::{Parser, Subcommand};

pub const DEFAULT_PACKAGE: &str = "caniuse-lite";

#[derive(Parser, Debug)]
#[command(
    name = "caniuse-refresh",
    about = "Refresh caniuse-lite in your lockfile and show how target browsers change",
    version,
    author
)]
pub struct Cli {
    /// Path inside the project (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    pub path: String,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Update the tracked package in the lockfile and report target browser changes
    Update {
        /// Package to refresh
        #[arg(long, value_name = "NAME", default_value = DEFAULT_PACKAGE)]
        package: String,

        /// Skip listing target browsers before and after the update
        #[arg(long)]
        no_diff: bool,
    },

    /// Compare the installed version with the latest release without changing anything
    Check {
        /// Package to inspect
        #[arg(long, value_name = "NAME", default_value = DEFAULT_PACKAGE)]
        package: String,
    },

    /// Print the browsers currently targeted by the project
    Browsers,
}
