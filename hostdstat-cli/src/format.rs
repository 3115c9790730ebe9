//! Report rendering: colored text blocks and JSON.

use std::fmt::Write as _;

use hostdstat_core::{Band, CollectionSummary, ConnectionOutcome, HostReport, Metric, MetricKind};

use crate::error::CliError;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Text renderer with optional ANSI colors
#[derive(Debug, Clone, Copy)]
pub struct TextFormatter {
    color: bool,
}

impl TextFormatter {
    #[must_use]
    pub const fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(self, style: &str, text: &str) -> String {
        if self.color {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn band(self, band: Band) -> String {
        self.paint(band_style(band), &band.to_string())
    }

    fn padded_band(self, band: Band) -> String {
        self.paint(band_style(band), &format!("{:<8}", band.to_string()))
    }

    /// One block per host: a header line and one line per metric
    pub fn host_report(self, report: &HostReport) -> String {
        let mut out = String::new();
        let header = match &report.connection {
            ConnectionOutcome::Connected => format!(
                "{} {}",
                self.paint(BOLD, &report.host),
                self.band(report.worst_band())
            ),
            ConnectionOutcome::AuthenticationFailed(reason) => format!(
                "{} {}",
                self.paint(BOLD, &report.host),
                self.paint(RED, &format!("authentication failed: {reason}"))
            ),
            ConnectionOutcome::ConnectionFailed(reason) => format!(
                "{} {}",
                self.paint(BOLD, &report.host),
                self.paint(RED, &format!("connection failed: {reason}"))
            ),
        };
        let _ = writeln!(out, "{header}");

        if report.connection.is_connected() {
            for kind in MetricKind::ALL {
                let _ = writeln!(out, "{}", self.metric_line(report.metric(kind)));
            }
        }
        out
    }

    fn metric_line(self, metric: &Metric) -> String {
        let unit = metric.kind.unit();
        let detail = match metric.kind {
            MetricKind::Responsiveness => match metric.responsive() {
                Some(true) => "responsive".to_string(),
                Some(false) => "non-responsive".to_string(),
                None => String::new(),
            },
            _ => match (metric.usage, metric.limit) {
                (Some(usage), Some(limit)) => {
                    let mut text = format!("{}{unit} / {}{unit}", number(usage), number(limit));
                    if let Some(pct) = metric.percent() {
                        let _ = write!(text, " ({pct:.1}%)");
                    }
                    if metric.at_limit() {
                        text.push_str(" at limit");
                    }
                    text
                }
                _ => String::new(),
            },
        };
        let detail = match &metric.error {
            Some(error) => self.paint(DIM, error),
            None => detail,
        };
        format!("  {:<15} {} {detail}", metric.kind.label(), self.padded_band(metric.band))
            .trim_end()
            .to_string()
    }

    /// Totals line for the whole cycle
    pub fn summary(self, summary: &CollectionSummary) -> String {
        format!(
            "{} {} hosts, {} connected, {} failed | {} {}  {} {}  {} {}  {} {}",
            self.paint(BOLD, "Summary:"),
            summary.total,
            summary.connected,
            summary.failed,
            self.band(Band::Green),
            summary.bands.green,
            self.band(Band::Warning),
            summary.bands.warning,
            self.band(Band::Red),
            summary.bands.red,
            self.band(Band::Unknown),
            summary.bands.unknown,
        )
    }
}

const fn band_style(band: Band) -> &'static str {
    match band {
        Band::Green => GREEN,
        Band::Warning => YELLOW,
        Band::Red => RED,
        Band::Unknown => DIM,
    }
}

/// Whole numbers without decimals, everything else with two
#[allow(clippy::float_cmp)]
fn number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Pretty JSON for the whole cycle
pub fn json_summary(summary: &CollectionSummary) -> Result<String, CliError> {
    serde_json::to_string_pretty(summary)
        .map_err(|e| CliError::Output(format!("Failed to serialize reports: {e}")))
}
