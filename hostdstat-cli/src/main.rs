//! `hostdstat` CLI - probes hostd resource health on hypervisor hosts
//!
//! Collects memory, thread, file-descriptor and responsiveness metrics over
//! SSH and prints them as colored text or JSON.

mod cli;
mod commands;
mod error;
mod format;
mod util;

use clap::Parser;
use cli::Cli;
use hostdstat_core::tracing::{TracingConfig, TracingLevel, TracingOutput, init_tracing};

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let output = cli
        .log_file
        .clone()
        .map_or(TracingOutput::Stderr, |path| TracingOutput::File { path });
    let tracing_config = TracingConfig::new()
        .with_level(TracingLevel::from_verbosity(cli.verbose, cli.quiet))
        .with_output(output);
    if let Err(e) = init_tracing(&tracing_config) {
        eprintln!("Warning: {e}");
    }

    let result = commands::dispatch(config_path, cli.no_color, cli.command);

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
