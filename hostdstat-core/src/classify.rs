//! Threshold classification of usage against a limit

use serde::{Deserialize, Serialize};

/// Usage percentage at or above which a metric is [`Band::Red`]
pub const RED_THRESHOLD_PERCENT: f64 = 95.0;

/// Usage percentage at or above which a metric is [`Band::Warning`]
pub const WARNING_THRESHOLD_PERCENT: f64 = 85.0;

/// Severity band of one metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Band {
    /// Below the warning threshold
    Green,
    /// Between the warning and red thresholds
    Warning,
    /// At or above the red threshold
    Red,
    /// Usage or limit could not be obtained
    #[default]
    Unknown,
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "GREEN"),
            Self::Warning => write!(f, "WARNING"),
            Self::Red => write!(f, "RED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Usage as a percentage of limit, `None` when the limit is not a positive
/// finite number
#[must_use]
pub fn usage_percent(usage: f64, limit: f64) -> Option<f64> {
    if !limit.is_finite() || limit <= 0.0 || !usage.is_finite() {
        return None;
    }
    Some(usage * 100.0 / limit)
}

/// Maps a usage/limit pair to a [`Band`].
///
/// `>= 95%` is red, `>= 85%` is warning, anything lower is green. A zero,
/// negative, or non-finite limit is unknown.
#[must_use]
pub fn classify(usage: f64, limit: f64) -> Band {
    match usage_percent(usage, limit) {
        None => Band::Unknown,
        Some(ratio) if ratio >= RED_THRESHOLD_PERCENT => Band::Red,
        Some(ratio) if ratio >= WARNING_THRESHOLD_PERCENT => Band::Warning,
        Some(_) => Band::Green,
    }
}

/// [`classify`] for values that may be missing
#[must_use]
pub fn classify_values(usage: Option<f64>, limit: Option<f64>) -> Band {
    match (usage, limit) {
        (Some(usage), Some(limit)) => classify(usage, limit),
        _ => Band::Unknown,
    }
}
