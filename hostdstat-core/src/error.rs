//! Error types for hostdstat operations
//!
//! Connect-time errors ([`HostdError::Authentication`], [`HostdError::Connection`])
//! abort probing for a single host. Command-level errors
//! ([`HostdError::CommandTimeout`], [`HostdError::CommandExecution`],
//! [`HostdError::Parse`]) are recovered by the probe layer and degrade one
//! metric to `Unknown`.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the hostdstat core
#[derive(Debug, Error)]
pub enum HostdError {
    /// Authentication was refused or no usable method was offered
    #[error("Authentication failed for '{host}': {reason}")]
    Authentication {
        /// Host that refused authentication
        host: String,
        /// Why authentication failed
        reason: String,
    },

    /// The transport could not be established (unreachable host, handshake failure)
    #[error("Connection to '{host}' failed: {reason}")]
    Connection {
        /// Host that could not be reached
        host: String,
        /// Transport-level failure description
        reason: String,
    },

    /// A command did not finish within its wait bound
    #[error("Command '{command}' timed out after {}s", .timeout.as_secs())]
    CommandTimeout {
        /// Command that was running
        command: String,
        /// The wait bound that elapsed
        timeout: Duration,
    },

    /// A command failed: nonzero exit, non-allow-listed stderr, or a channel error
    #[error("Command '{command}' failed: {reason}")]
    CommandExecution {
        /// Command that failed
        command: String,
        /// Exit status or stderr summary
        reason: String,
    },

    /// Output of an otherwise successful command lacked the expected numeric token
    #[error("Failed to parse '{input}': {reason}")]
    Parse {
        /// The raw text that could not be parsed
        input: String,
        /// What was expected
        reason: String,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host list was empty
    #[error("No hosts to collect from")]
    NoHosts,

    /// Every host failed to connect
    #[error("All {total} hosts failed to connect")]
    AllHostsFailed {
        /// Number of hosts attempted
        total: usize,
    },

    /// Local I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostdError {
    /// Returns true for errors raised while establishing a connection
    #[must_use]
    pub const fn is_connect_error(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::Connection { .. })
    }

    /// Creates an [`HostdError::Authentication`] error
    pub fn auth(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Authentication {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`HostdError::Connection`] error
    pub fn connection(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`HostdError::CommandExecution`] error
    pub fn execution(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`HostdError::Parse`] error
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for hostdstat operations
pub type HostdResult<T> = Result<T, HostdError>;
