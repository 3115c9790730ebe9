//! Benign stderr substrings

use serde::{Deserialize, Serialize};

/// Stderr noise the hypervisor shell prints on otherwise healthy commands
pub const DEFAULT_STDERR_ALLOWLIST: &[&str] =
    &["Terminating watchdog process", "Picked up JAVA_TOOL_OPTIONS:"];

/// Substrings that make nonempty stderr acceptable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StderrAllowList(Vec<String>);

impl StderrAllowList {
    /// Creates an allow-list from the given substrings
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(entries.into_iter().map(Into::into).collect())
    }

    /// An allow-list that accepts no stderr at all
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Returns true when `stderr` contains any allow-listed substring.
    ///
    /// Empty entries never match.
    #[must_use]
    pub fn allows(&self, stderr: &str) -> bool {
        self.0
            .iter()
            .any(|entry| !entry.is_empty() && stderr.contains(entry.as_str()))
    }

    /// The configured substrings
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.0
    }
}

impl Default for StderrAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_STDERR_ALLOWLIST.iter().copied())
    }
}
