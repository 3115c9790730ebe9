//! CLI error types and exit codes.

use hostdstat_core::HostdError;

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, input, or other non-connection errors
    pub const GENERAL_ERROR: i32 = 1;
    /// No host could be connected
    pub const ALL_HOSTS_FAILED: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad host list or other user input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Password could not be read
    #[error("Password error: {0}")]
    Password(String),

    /// Every host failed to connect
    #[error("All {0} hosts failed to connect")]
    AllHostsFailed(usize),

    /// Collection error
    #[error("Collection failed: {0}")]
    Collection(String),

    /// Output error
    #[error("Output error: {0}")]
    Output(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<HostdError> for CliError {
    fn from(err: HostdError) -> Self {
        match err {
            HostdError::Config(e) => Self::Config(e),
            HostdError::NoHosts => Self::Input("no hosts to collect from".to_string()),
            HostdError::AllHostsFailed { total } => Self::AllHostsFailed(total),
            HostdError::Io(e) => Self::Io(e),
            other => Self::Collection(other.to_string()),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success, at least one host connected
    /// - 1: General error (configuration, input, IO)
    /// - 2: No host connected
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::AllHostsFailed(_) => exit_codes::ALL_HOSTS_FAILED,
            Self::Config(_)
            | Self::Input(_)
            | Self::Password(_)
            | Self::Collection(_)
            | Self::Output(_)
            | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
