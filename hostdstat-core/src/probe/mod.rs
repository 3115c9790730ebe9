//! Metric probes
//!
//! A [`MetricProbe`] pairs a usage pipeline with an optional limit pipeline
//! and says how to pull a number out of each. Running a probe never fails:
//! a timeout, dirty stderr, or unparseable output turns that one metric
//! [`Band::Unknown`] and leaves the other probes alone.

pub mod commands;
pub mod extract;
pub mod metric;

use std::time::Duration;

use tracing::Instrument;

pub use commands::ProbeCommands;
pub use extract::Extraction;
pub use metric::{Metric, MetricKind};

use crate::classify::{Band, classify};
use crate::error::{HostdError, HostdResult};
use crate::session::CommandSession;
use crate::tracing::span_names;

/// Declarative description of one metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricProbe {
    /// Which resource this probe measures
    pub kind: MetricKind,
    /// Pipeline printing the usage value (or the marker, for responsiveness)
    pub usage_command: String,
    /// Pipeline printing the limit value
    pub limit_command: Option<String>,
    /// How to read the usage value
    pub usage_extraction: Extraction,
    /// How to read the limit value
    pub limit_extraction: Extraction,
}

impl MetricProbe {
    /// Hostd resource group memory, both values in MB
    #[must_use]
    pub fn memory(commands: &ProbeCommands) -> Self {
        Self {
            kind: MetricKind::Memory,
            usage_command: commands.memory_usage.clone(),
            limit_command: Some(commands.memory_limit.clone()),
            usage_extraction: Extraction::Megabytes,
            limit_extraction: Extraction::Megabytes,
        }
    }

    /// Busy worker threads; a log without `HandleWork` lines means zero
    #[must_use]
    pub fn thread(commands: &ProbeCommands) -> Self {
        Self {
            kind: MetricKind::Thread,
            usage_command: commands.thread_usage.clone(),
            limit_command: Some(commands.thread_limit.clone()),
            usage_extraction: Extraction::NumberOrZero,
            limit_extraction: Extraction::Number,
        }
    }

    /// Descriptors held by hostd workers
    #[must_use]
    pub fn file_descriptor(commands: &ProbeCommands) -> Self {
        Self {
            kind: MetricKind::FileDescriptor,
            usage_command: commands.fd_usage.clone(),
            limit_command: Some(commands.fd_limit.clone()),
            usage_extraction: Extraction::Number,
            limit_extraction: Extraction::Number,
        }
    }

    /// Watchdog non-responsiveness marker
    #[must_use]
    pub fn responsiveness(commands: &ProbeCommands) -> Self {
        Self {
            kind: MetricKind::Responsiveness,
            usage_command: commands.responsiveness.clone(),
            limit_command: None,
            usage_extraction: Extraction::Number,
            limit_extraction: Extraction::Number,
        }
    }

    /// The four probes in collection order: memory, thread, fd, responsiveness
    #[must_use]
    pub fn standard_set(commands: &ProbeCommands) -> Vec<Self> {
        vec![
            Self::memory(commands),
            Self::thread(commands),
            Self::file_descriptor(commands),
            Self::responsiveness(commands),
        ]
    }

    /// Runs the probe and classifies the result
    pub async fn run(&self, session: &mut CommandSession<'_>, timeout: Duration) -> Metric {
        let span = tracing::debug_span!(
            span_names::PROBE_RUN,
            host = %session.host(),
            metric = %self.kind
        );
        async {
            let metric = if self.kind == MetricKind::Responsiveness {
                self.run_marker(session, timeout).await
            } else {
                self.run_ratio(session, timeout).await
            };
            if let Some(error) = &metric.error {
                tracing::warn!(metric = %self.kind, error = %error, "Metric unavailable");
            } else {
                tracing::debug!(metric = %self.kind, band = %metric.band, "Metric classified");
            }
            metric
        }
        .instrument(span)
        .await
    }

    async fn run_ratio(&self, session: &mut CommandSession<'_>, timeout: Duration) -> Metric {
        let usage_raw = accepted_stdout(session, &self.usage_command, timeout).await;
        let limit_raw = match &self.limit_command {
            Some(command) => accepted_stdout(session, command, timeout).await,
            None => Err(HostdError::execution(
                &self.usage_command,
                "no limit command",
            )),
        };

        let usage = usage_raw
            .as_deref()
            .map_err(|e| e.to_string())
            .and_then(|raw| self.usage_extraction.extract(raw).map_err(|e| e.to_string()));
        let limit = limit_raw
            .as_deref()
            .map_err(|e| e.to_string())
            .and_then(|raw| self.limit_extraction.extract(raw).map_err(|e| e.to_string()));

        let (band, error) = match (&usage, &limit) {
            (Ok(usage), Ok(limit)) => {
                let band = classify(*usage, *limit);
                let error = (band == Band::Unknown)
                    .then(|| format!("limit {limit} is not a positive number"));
                (band, error)
            }
            (Err(e), _) | (_, Err(e)) => (Band::Unknown, Some(e.clone())),
        };

        Metric {
            kind: self.kind,
            usage_raw: usage_raw.ok().map(|s| s.trim().to_string()),
            limit_raw: limit_raw.ok().map(|s| s.trim().to_string()),
            usage: usage.ok(),
            limit: limit.ok(),
            band,
            error,
        }
    }

    async fn run_marker(&self, session: &mut CommandSession<'_>, timeout: Duration) -> Metric {
        match accepted_stdout(session, &self.usage_command, timeout).await {
            Ok(stdout) => {
                let marker = stdout.trim();
                let band = if marker.is_empty() {
                    Band::Green
                } else {
                    Band::Red
                };
                Metric {
                    kind: self.kind,
                    usage_raw: Some(marker.to_string()),
                    limit_raw: None,
                    usage: Some(if marker.is_empty() { 0.0 } else { 1.0 }),
                    limit: None,
                    band,
                    error: None,
                }
            }
            Err(e) => Metric::unknown(self.kind, e.to_string()),
        }
    }
}

/// Runs `command` and returns stdout if stderr is clean
async fn accepted_stdout(
    session: &mut CommandSession<'_>,
    command: &str,
    timeout: Duration,
) -> HostdResult<String> {
    let allow = session.policy().allowlist.clone();
    session
        .execute(command, timeout)
        .await?
        .accepted_output(command, &allow)
}
