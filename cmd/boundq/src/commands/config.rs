//! Configuration commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use super::output_for;
use crate::config::{load_config, RunConfig};
use crate::Cli;

/// Inspect or create the run configuration.
///
/// Configuration is stored in ~/.boundq/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// View the resolved configuration
    View,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> Result<()> {
        match &self.command {
            ConfigSubcommand::View => {
                let cfg = load_config(cli.config.as_deref())?;
                output_for(cli).write(&cfg)
            }
            ConfigSubcommand::Init { force } => {
                let path = match &cli.config {
                    Some(p) => PathBuf::from(p),
                    None => RunConfig::default_path()
                        .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
                };
                if path.exists() && !force {
                    anyhow::bail!("{} already exists, use --force to overwrite", path.display());
                }
                RunConfig::default().save(&path)?;
                println!("Wrote {}", path.display());
                Ok(())
            }
        }
    }
}
