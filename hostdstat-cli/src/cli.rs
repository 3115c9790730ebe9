//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Probes hostd memory, thread, file-descriptor and responsiveness health
#[derive(Parser)]
#[command(name = "hostdstat")]
#[command(author, version, about = "hostd resource health probe")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Collect metrics from hosts
    #[command(about = "Probe hosts and print one report per host")]
    Collect(CollectArgs),

    /// Print the effective configuration as TOML
    #[command(about = "Show the effective configuration")]
    Config,
}

/// Arguments of `hostdstat collect`
#[derive(Args, Debug, Default)]
pub struct CollectArgs {
    /// Host to probe, as `address` or `address:port` (repeatable)
    #[arg(short = 'H', long = "host", value_name = "HOST")]
    pub hosts: Vec<String>,

    /// File with one host per line; `#` starts a comment
    #[arg(short = 'f', long, value_name = "PATH")]
    pub hosts_file: Option<PathBuf>,

    /// Login name for hosts that do not configure one
    #[arg(short, long, default_value = "root")]
    pub username: String,

    /// Password shared by all hosts; prompted for when absent
    #[arg(short, long, env = "HOSTDSTAT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Run the probes through the local shell instead of SSH
    #[arg(long)]
    pub local: bool,

    /// Per-command timeout in seconds (overrides the config)
    #[arg(long, value_name = "SECS")]
    pub command_timeout: Option<u64>,

    /// Connect timeout in seconds (overrides the config)
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Hosts probed at once (overrides the config)
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,
}

/// Report output formats
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One colored block per host
    #[default]
    Text,
    /// A single JSON document with all reports
    Json,
}
