//! Configuration for hostdstat
//!
//! Settings live in `config.toml` under the user's config directory
//! (`~/.config/hostdstat/config.toml` on Linux). Every field has a default,
//! so a missing file or a partial table is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::CollectorOptions;
use crate::error::{HostdError, HostdResult};
use crate::host::{Credentials, DEFAULT_SSH_PORT, Host};
use crate::probe::ProbeCommands;
use crate::session::{ExecPolicy, StderrAllowList};

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "hostdstat";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Collector timing and parallelism (`[collector]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorSettings {
    /// Bound on each probe command in seconds (default: 300)
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// TCP connect plus SSH handshake bound in seconds (default: 30)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Reader grace period after end of output in milliseconds (default: 2000)
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    /// Sleep after a detached command in seconds (default: 10)
    #[serde(default = "default_detached_start_delay_secs")]
    pub detached_start_delay_secs: u64,
    /// Hosts collected at once (default: 1)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// SSH port for hosts that do not set one (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,
}

const fn default_command_timeout_secs() -> u64 {
    crate::collector::DEFAULT_COMMAND_TIMEOUT_SECS
}

const fn default_connect_timeout_secs() -> u64 {
    crate::transport::ssh::SSH_CONNECT_TIMEOUT_SECS
}

const fn default_grace_period_ms() -> u64 {
    crate::session::command::DEFAULT_GRACE_PERIOD_MS
}

const fn default_detached_start_delay_secs() -> u64 {
    crate::session::command::DEFAULT_DETACHED_START_DELAY_SECS
}

const fn default_concurrency() -> usize {
    crate::collector::DEFAULT_CONCURRENCY
}

const fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            grace_period_ms: default_grace_period_ms(),
            detached_start_delay_secs: default_detached_start_delay_secs(),
            concurrency: default_concurrency(),
            port: default_port(),
        }
    }
}

impl CollectorSettings {
    /// Concurrency clamped to at least 1
    #[must_use]
    pub const fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            1
        } else {
            self.concurrency
        }
    }

    /// Per-command timeout
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Connect timeout
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Stderr handling (`[stderr]`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StderrSettings {
    /// Substrings that make stderr benign
    #[serde(default)]
    pub allowlist: StderrAllowList,
}

/// A statically configured host (`[[hosts]]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    /// Hostname or IP address
    pub address: String,
    /// SSH port; falls back to `[collector].port`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Login name; falls back to the command-line username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Collector timing
    #[serde(default)]
    pub collector: CollectorSettings,
    /// Stderr allow-list
    #[serde(default)]
    pub stderr: StderrSettings,
    /// Probe pipeline overrides
    #[serde(default)]
    pub commands: ProbeCommands,
    /// Static hosts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<HostEntry>,
}

impl Settings {
    /// Default config file location, if the platform has a config directory
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parses settings from TOML text and validates them.
    ///
    /// # Errors
    ///
    /// Returns [`HostdError::Config`] for malformed TOML or invalid values.
    pub fn from_toml(content: &str) -> HostdResult<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| HostdError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HostdError::Io`] if the file cannot be read and
    /// [`HostdError::Config`] if it is invalid.
    pub fn load(path: &Path) -> HostdResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), hosts = settings.hosts.len(), "Loaded configuration");
        Ok(settings)
    }

    /// Loads from `path`, or the default location when `path` is `None`.
    /// A missing default file yields defaults; an explicit path must exist.
    ///
    /// # Errors
    ///
    /// Same as [`Settings::load`].
    pub fn load_or_default(path: Option<&Path>) -> HostdResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Serializes to TOML
    ///
    /// # Errors
    ///
    /// Returns [`HostdError::Config`] if serialization fails.
    pub fn to_toml(&self) -> HostdResult<String> {
        toml::to_string_pretty(self).map_err(|e| HostdError::Config(e.to_string()))
    }

    /// Checks values that have no usable interpretation.
    ///
    /// # Errors
    ///
    /// Returns [`HostdError::Config`] naming the first bad field.
    pub fn validate(&self) -> HostdResult<()> {
        if self.collector.command_timeout_secs == 0 {
            return Err(HostdError::Config(
                "collector.command_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.collector.connect_timeout_secs == 0 {
            return Err(HostdError::Config(
                "collector.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.collector.port == 0 {
            return Err(HostdError::Config("collector.port must not be 0".to_string()));
        }
        if let Some(entry) = self.hosts.iter().find(|h| h.address.trim().is_empty()) {
            return Err(HostdError::Config(format!(
                "host entry with empty address (port {:?})",
                entry.port
            )));
        }
        Ok(())
    }

    /// Session policy derived from these settings
    #[must_use]
    pub fn exec_policy(&self) -> ExecPolicy {
        ExecPolicy {
            grace_period: Duration::from_millis(self.collector.grace_period_ms),
            detached_start_delay: Duration::from_secs(self.collector.detached_start_delay_secs),
            allowlist: self.stderr.allowlist.clone(),
            ..ExecPolicy::default()
        }
    }

    /// Collector options derived from these settings
    #[must_use]
    pub fn collector_options(&self) -> CollectorOptions {
        CollectorOptions::default()
            .with_command_timeout(self.collector.command_timeout())
            .with_concurrency(self.collector.effective_concurrency())
            .with_policy(self.exec_policy())
            .with_commands(self.commands.clone())
    }

    /// Builds hosts from the `[[hosts]]` entries.
    ///
    /// Entries without a username take `default_username`; all hosts share
    /// `password`.
    #[must_use]
    pub fn configured_hosts(&self, default_username: &str, password: &secrecy::SecretString) -> Vec<Host> {
        self.hosts
            .iter()
            .map(|entry| {
                let username = entry.username.as_deref().unwrap_or(default_username);
                Host::new(
                    entry.address.trim(),
                    Credentials::with_secret(username, password.clone()),
                )
                .with_port(entry.port.unwrap_or(self.collector.port))
            })
            .collect()
    }
}
