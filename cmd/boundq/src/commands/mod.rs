//! Command implementations.

mod config;
mod run;

pub use config::ConfigCommand;
pub use run::RunCommand;

use crate::output::{Output, OutputFormat};
use crate::Cli;

/// Builds the output writer selected by the global flags.
pub fn output_for(cli: &Cli) -> Output {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Yaml
    };
    Output::new(format, cli.output.clone())
}
