//! Structured logging setup
//!
//! Logs go to stderr or a file, never stdout, which carries reports. Spans
//! cover host collection, connection establishment, probe runs and single
//! commands. Passwords are never recorded; usernames only at debug level.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Set by the first successful [`init_tracing`] call
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Errors from [`init_tracing`]
#[derive(Debug, Error)]
pub enum TracingError {
    /// The filter directive did not parse or the subscriber was rejected
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// A subscriber is already installed
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// The log file could not be created
    #[error("Failed to create log file {path}: {source}")]
    LogFile {
        /// Requested log file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Result type for tracing setup
pub type TracingResult<T> = Result<T, TracingError>;

/// Log level for hostdstat's own targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingLevel {
    /// Errors only
    Error,
    /// Connection failures and degraded metrics
    #[default]
    Warn,
    /// Per-host progress
    Info,
    /// Every command issued
    Debug,
    /// State transitions and stream details
    Trace,
}

impl TracingLevel {
    /// Level for a `-v` count; `quiet` wins over any count
    #[must_use]
    pub const fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Error;
        }
        match verbose {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Directive spelling of the level
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(TracingError::InitializationFailed(format!(
                "unknown log level `{other}`"
            ))),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where log lines are written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard error, with ANSI colors
    #[default]
    Stderr,
    /// A file, truncated on start, without colors
    File {
        /// Path to the log file
        path: PathBuf,
    },
}

/// Logging setup for one process
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Level for hostdstat targets
    pub level: TracingLevel,
    /// Destination
    pub output: TracingOutput,
    /// Raw `EnvFilter` directive replacing the level-derived one
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Warn level to stderr
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Replaces the level-derived filter
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// The `EnvFilter` directive to install.
    ///
    /// `russh` stays at warn unless a custom filter says otherwise; its debug
    /// output is per-packet.
    #[must_use]
    pub fn filter_directive(&self) -> String {
        self.filter.clone().unwrap_or_else(|| {
            let level = self.level;
            format!("hostdstat_core={level},hostdstat={level},russh=warn")
        })
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// [`TracingError::AlreadyInitialized`] on any call after the first
/// successful one, [`TracingError::LogFile`] when the log file cannot be
/// created, and [`TracingError::InitializationFailed`] for a bad filter
/// directive. A failed call leaves the process free to try again.
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.load(Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let filter = EnvFilter::try_new(config.filter_directive())
        .map_err(|e| TracingError::InitializationFailed(e.to_string()))?;

    let (writer, ansi) = match &config.output {
        TracingOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        TracingOutput::File { path } => {
            let file = std::fs::File::create(path).map_err(|source| TracingError::LogFile {
                path: path.clone(),
                source,
            })?;
            (BoxMakeWriter::new(Arc::new(file)), false)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| TracingError::InitializationFailed(e.to_string()))?;
    TRACING_INITIALIZED.store(true, Ordering::SeqCst);

    tracing::debug!(level = %config.level, output = ?config.output, "Tracing initialized");
    Ok(())
}

/// Span names shared by the collector, probes, sessions and transports
pub mod span_names {
    /// One host's collection cycle
    pub const HOST_COLLECT: &str = "host.collect";
    /// Connect plus authentication
    pub const CONNECTION_ESTABLISH: &str = "connection.establish";
    /// One metric probe
    pub const PROBE_RUN: &str = "probe.run";
    /// One command on a channel
    pub const COMMAND_EXECUTE: &str = "command.execute";
}
