//! Probe results

use serde::{Deserialize, Serialize};

use crate::classify::{Band, usage_percent};

/// Which hostd resource a metric measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Resource group memory (MB)
    Memory,
    /// Busy worker threads against the pool size
    Thread,
    /// Open descriptors against the descriptor floor
    FileDescriptor,
    /// Presence of the watchdog's non-responsive marker
    Responsiveness,
}

impl MetricKind {
    /// All kinds, in probe order
    pub const ALL: [Self; 4] = [
        Self::Memory,
        Self::Thread,
        Self::FileDescriptor,
        Self::Responsiveness,
    ];

    /// Short label used in reports and logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Thread => "thread",
            Self::FileDescriptor => "fd",
            Self::Responsiveness => "responsiveness",
        }
    }

    /// Unit suffix for display
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Memory => " MB",
            Self::Thread | Self::FileDescriptor | Self::Responsiveness => "",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One classified measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Which resource
    pub kind: MetricKind,
    /// Stdout of the usage command, trimmed
    pub usage_raw: Option<String>,
    /// Stdout of the limit command, trimmed
    pub limit_raw: Option<String>,
    /// Extracted usage
    pub usage: Option<f64>,
    /// Extracted limit
    pub limit: Option<f64>,
    /// Severity
    pub band: Band,
    /// Why the metric is unknown, if it is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Metric {
    /// A metric that could not be measured
    pub fn unknown(kind: MetricKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            usage_raw: None,
            limit_raw: None,
            usage: None,
            limit: None,
            band: Band::Unknown,
            error: Some(error.into()),
        }
    }

    /// Usage as a percentage of limit (0.0–100.0, may exceed 100)
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        match (self.usage, self.limit) {
            (Some(usage), Some(limit)) => usage_percent(usage, limit),
            _ => None,
        }
    }

    /// True when usage has reached the limit exactly.
    ///
    /// The memory group pins `Effective Minimum` to `Total Memory` once
    /// hostd can grow no further.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn at_limit(&self) -> bool {
        matches!((self.usage, self.limit), (Some(usage), Some(limit)) if usage == limit)
    }

    /// Responsiveness verdict: `Some(false)` when the marker was found,
    /// `None` for other kinds or an unknown result
    #[must_use]
    pub fn responsive(&self) -> Option<bool> {
        if self.kind != MetricKind::Responsiveness {
            return None;
        }
        match self.band {
            Band::Green => Some(true),
            Band::Red => Some(false),
            Band::Warning | Band::Unknown => None,
        }
    }
}
