//! boundq - drive producers and consumers through a bounded buffer.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;

use commands::{ConfigCommand, RunCommand};

/// boundq - drive producers and consumers through a bounded buffer.
///
/// One producer pushes the integers 1..=N through a fixed-capacity buffer
/// to one or more consumers. The run then checks that every item arrived
/// exactly once and that every worker terminated.
///
/// Configuration is read from ~/.boundq/config.yaml when present.
#[derive(Parser)]
#[command(name = "boundq")]
#[command(about = "Bounded buffer producer/consumer driver")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.boundq/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run producer and consumers and verify the transfer
    Run(RunCommand),
    /// Manage CLI configuration
    Config(ConfigCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so that --json output stays clean
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Run(cmd) => cmd.run(&cli),
        Commands::Config(cmd) => cmd.run(&cli),
    }
}
