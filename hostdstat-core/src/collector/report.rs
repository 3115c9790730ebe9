//! Per-host report records and the cycle summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::StateTrace;
use crate::classify::Band;
use crate::error::HostdError;
use crate::probe::{Metric, MetricKind};

/// How the connection attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ConnectionOutcome {
    /// Authenticated and probed
    Connected,
    /// The host refused the credentials or offered no usable method
    AuthenticationFailed(String),
    /// The host could not be reached
    ConnectionFailed(String),
}

impl ConnectionOutcome {
    /// Maps a connect-time error to an outcome
    #[must_use]
    pub fn from_error(error: &HostdError) -> Self {
        match error {
            HostdError::Authentication { reason, .. } => Self::AuthenticationFailed(reason.clone()),
            HostdError::Connection { reason, .. } => Self::ConnectionFailed(reason.clone()),
            other => Self::ConnectionFailed(other.to_string()),
        }
    }

    /// True for [`ConnectionOutcome::Connected`]
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Everything learned about one host in one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostReport {
    /// Host address as given
    pub host: String,
    /// Connection result
    pub connection: ConnectionOutcome,
    /// Resource group memory
    pub memory: Metric,
    /// Worker threads
    pub thread: Metric,
    /// File descriptors
    pub fd: Metric,
    /// Watchdog responsiveness
    pub responsiveness: Metric,
    /// When the report was assembled
    pub collected_at: DateTime<Utc>,
    /// Lifecycle states the host passed through
    pub states: StateTrace,
}

impl HostReport {
    /// A report for a host that could not be connected; all metrics unknown
    #[must_use]
    pub fn connect_failed(host: impl Into<String>, error: &HostdError, states: StateTrace) -> Self {
        let reason = error.to_string();
        let unknown = |kind| Metric::unknown(kind, format!("not collected: {reason}"));
        Self {
            host: host.into(),
            connection: ConnectionOutcome::from_error(error),
            memory: unknown(MetricKind::Memory),
            thread: unknown(MetricKind::Thread),
            fd: unknown(MetricKind::FileDescriptor),
            responsiveness: unknown(MetricKind::Responsiveness),
            collected_at: Utc::now(),
            states,
        }
    }

    /// The four metrics in probe order
    #[must_use]
    pub fn metrics(&self) -> [&Metric; 4] {
        [&self.memory, &self.thread, &self.fd, &self.responsiveness]
    }

    /// Metric of the given kind
    #[must_use]
    pub const fn metric(&self, kind: MetricKind) -> &Metric {
        match kind {
            MetricKind::Memory => &self.memory,
            MetricKind::Thread => &self.thread,
            MetricKind::FileDescriptor => &self.fd,
            MetricKind::Responsiveness => &self.responsiveness,
        }
    }

    /// Highest severity among the known metrics, or `Unknown` if none are known
    #[must_use]
    pub fn worst_band(&self) -> Band {
        let rank = |band: Band| match band {
            Band::Unknown => 0,
            Band::Green => 1,
            Band::Warning => 2,
            Band::Red => 3,
        };
        self.metrics()
            .into_iter()
            .map(|m| m.band)
            .max_by_key(|band| rank(*band))
            .unwrap_or(Band::Unknown)
    }
}

/// Number of metrics in each band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounts {
    /// Green metrics
    pub green: usize,
    /// Warning metrics
    pub warning: usize,
    /// Red metrics
    pub red: usize,
    /// Unknown metrics
    pub unknown: usize,
}

impl BandCounts {
    fn add(&mut self, band: Band) {
        match band {
            Band::Green => self.green += 1,
            Band::Warning => self.warning += 1,
            Band::Red => self.red += 1,
            Band::Unknown => self.unknown += 1,
        }
    }
}

/// Reports and totals for one collection cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    /// Hosts attempted
    pub total: usize,
    /// Hosts that connected
    pub connected: usize,
    /// Hosts that failed to connect
    pub failed: usize,
    /// Metric count per band across all hosts
    pub bands: BandCounts,
    /// Per-host reports, in input order
    pub reports: Vec<HostReport>,
}

impl CollectionSummary {
    /// Creates an empty summary
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total: 0,
            connected: 0,
            failed: 0,
            bands: BandCounts {
                green: 0,
                warning: 0,
                red: 0,
                unknown: 0,
            },
            reports: Vec::new(),
        }
    }

    /// Builds a summary from finished reports
    #[must_use]
    pub fn from_reports(reports: Vec<HostReport>) -> Self {
        let mut summary = Self::new();
        for report in reports {
            summary.add_report(report);
        }
        summary
    }

    /// Adds one report to the totals
    pub fn add_report(&mut self, report: HostReport) {
        self.total += 1;
        if report.connection.is_connected() {
            self.connected += 1;
        } else {
            self.failed += 1;
        }
        for metric in report.metrics() {
            self.bands.add(metric.band);
        }
        self.reports.push(report);
    }

    /// True when no host connected
    #[must_use]
    pub const fn all_failed(&self) -> bool {
        self.total > 0 && self.connected == 0
    }
}
