//! CLI definition and command handling

pub mod commands;
mod context;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::{CompletionsCommand, KeyCommand, TeamCommand};
pub use context::Context;

/// Keyroster - signed team rosters of OpenPGP keys
#[derive(Debug, Parser)]
#[command(name = "keyroster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (default: the platform data directory)
    #[arg(long, global = true, env = "KEYROSTER_HOME")]
    pub home: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage signing keys
    Key(KeyCommand),

    /// Create, inspect, change and verify team rosters
    Team(TeamCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        match &self.command {
            Commands::Key(cmd) => cmd.execute(self, ctx),
            Commands::Team(cmd) => cmd.execute(self, ctx),
            Commands::Completions(cmd) => cmd.execute(self),
        }
    }
}

/// Parse `args` as a command line against the data directory `home` and run it
#[cfg(test)]
pub(crate) fn run_in(home: &std::path::Path, args: &[&str]) -> anyhow::Result<()> {
    let home = home.to_string_lossy();
    let mut argv = vec!["keyroster", "-q", "--home", &*home];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv)?;
    let ctx = Context::load(cli.home.as_deref())?;
    cli.execute(&ctx)
}
