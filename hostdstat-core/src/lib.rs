//! `hostdstat` Core Library
//!
//! Probes the hostd management daemon on hypervisor hosts for memory,
//! thread and file-descriptor pressure plus responsiveness, by running
//! diagnostic pipelines over SSH and classifying each metric against fixed
//! percentage thresholds.
//!
//! # Crate Structure
//!
//! - [`transport`] - Connectors (SSH, local shell) and the process/channel traits
//! - [`session`] - Time-boxed command execution with concurrent stdout/stderr capture
//! - [`probe`] - Metric probes, default pipelines, numeric extraction
//! - [`classify`] - Threshold bands
//! - [`collector`] - Per-host orchestration, reports and the cycle summary
//! - [`config`] - TOML settings
//! - [`tracing`] - Structured logging setup
//! - [`testing`] - Scripted in-memory transport

#![warn(missing_docs)]

pub mod classify;
pub mod collector;
pub mod config;
pub mod error;
pub mod host;
pub mod probe;
pub mod session;
pub mod testing;
pub mod tracing;
pub mod transport;

pub use classify::{Band, classify, classify_values};
pub use collector::{
    CollectionSummary, CollectorOptions, ConnectionOutcome, HostReport, HostState,
    StatsCollector,
};
pub use config::Settings;
pub use error::{HostdError, HostdResult};
pub use host::{Credentials, Host};
pub use probe::{Metric, MetricKind, MetricProbe, ProbeCommands};
pub use session::{CommandOutput, CommandResult, CommandSession, ExecPolicy, StderrAllowList};
pub use transport::{Connector, LocalConnector, SshConnector};
