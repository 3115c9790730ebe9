//! Command handler modules for the CLI.

mod collect;
mod config;

use std::path::Path;

use crate::cli::Commands;
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(config_path: Option<&Path>, no_color: bool, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Collect(args) => collect::cmd_collect(config_path, &args, !no_color),
        Commands::Config => config::cmd_config(config_path),
    }
}
