//! Time-boxed command execution over one connection

use std::time::Duration;

use serde::Serialize;
use tracing::Instrument;

use super::reader::DualStreamCapture;
use super::stderr::StderrAllowList;
use crate::error::{HostdError, HostdResult};
use crate::tracing::span_names;
use crate::transport::{RemoteConnection, SpawnMode};

/// Default grace period for readers after end of channel (milliseconds)
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2000;

/// Default sleep after issuing a detached command (seconds)
pub const DEFAULT_DETACHED_START_DELAY_SECS: u64 = 10;

/// How long to wait for an exit status after end of output
const DEFAULT_EXIT_STATUS_WAIT: Duration = Duration::from_secs(1);

/// Knobs shared by every command on a session
#[derive(Debug, Clone)]
pub struct ExecPolicy {
    /// How long readers may keep draining after the channel reports end of output
    pub grace_period: Duration,
    /// Sleep after issuing a detached command
    pub detached_start_delay: Duration,
    /// Bound on waiting for the exit status report
    pub exit_status_wait: Duration,
    /// Stderr that does not count as failure
    pub allowlist: StderrAllowList,
}

impl Default for ExecPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
            detached_start_delay: Duration::from_secs(DEFAULT_DETACHED_START_DELAY_SECS),
            exit_status_wait: DEFAULT_EXIT_STATUS_WAIT,
            allowlist: StderrAllowList::default(),
        }
    }
}

/// Output of a command that ran to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
    /// Exit status, if the remote reported one
    pub exit_status: Option<i32>,
}

impl CommandOutput {
    /// True when stderr is empty or allow-listed
    #[must_use]
    pub fn stderr_clean(&self, allow: &StderrAllowList) -> bool {
        self.stderr.is_empty() || allow.allows(&self.stderr)
    }

    /// Success rule for a finished command.
    ///
    /// Exit status 0 or absent with empty stderr succeeds. Anything else
    /// fails unless stderr carries an allow-listed substring.
    #[must_use]
    pub fn is_success(&self, allow: &StderrAllowList) -> bool {
        if self.stderr.is_empty() {
            matches!(self.exit_status, None | Some(0))
        } else {
            allow.allows(&self.stderr)
        }
    }
}

/// Outcome of [`CommandSession::execute`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandResult {
    /// The channel reported end of output within the timeout
    Completed(CommandOutput),
    /// The timeout elapsed first; no output is kept
    TimedOut {
        /// The command that was cut off
        command: String,
        /// The bound that elapsed
        #[serde(with = "duration_secs")]
        after: Duration,
    },
}

impl CommandResult {
    /// Applies [`CommandOutput::is_success`]; a timeout is never a success
    #[must_use]
    pub fn is_success(&self, allow: &StderrAllowList) -> bool {
        match self {
            Self::Completed(output) => output.is_success(allow),
            Self::TimedOut { .. } => false,
        }
    }

    /// Returns the output of a completed command
    #[must_use]
    pub const fn output(&self) -> Option<&CommandOutput> {
        match self {
            Self::Completed(output) => Some(output),
            Self::TimedOut { .. } => None,
        }
    }

    /// Returns stdout when stderr is clean, regardless of exit status.
    ///
    /// Probe pipelines end in `grep`, which exits 1 on no match; that is a
    /// valid "nothing found" answer, so only stderr decides here.
    ///
    /// # Errors
    ///
    /// [`HostdError::CommandTimeout`] for a timed-out command,
    /// [`HostdError::CommandExecution`] when stderr is not allow-listed.
    pub fn accepted_output(self, command: &str, allow: &StderrAllowList) -> HostdResult<String> {
        match self {
            Self::TimedOut { command, after } => Err(HostdError::CommandTimeout {
                command,
                timeout: after,
            }),
            Self::Completed(output) => {
                if output.stderr_clean(allow) {
                    Ok(output.stdout)
                } else {
                    Err(HostdError::execution(
                        command,
                        format!(
                            "stderr: {} (exit status {})",
                            output.stderr.trim(),
                            output
                                .exit_status
                                .map_or_else(|| "unknown".to_string(), |s| s.to_string())
                        ),
                    ))
                }
            }
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

/// Runs commands, one channel at a time, on a borrowed connection
pub struct CommandSession<'c> {
    connection: &'c mut dyn RemoteConnection,
    policy: &'c ExecPolicy,
}

impl<'c> CommandSession<'c> {
    /// Creates a session over `connection`
    pub fn new(connection: &'c mut dyn RemoteConnection, policy: &'c ExecPolicy) -> Self {
        Self { connection, policy }
    }

    /// The execution policy in effect
    #[must_use]
    pub const fn policy(&self) -> &ExecPolicy {
        self.policy
    }

    /// Host this session runs on
    #[must_use]
    pub fn host(&self) -> &str {
        self.connection.host()
    }

    /// Runs `command`, waiting at most `timeout` for the channel to reach end
    /// of output.
    ///
    /// Both output streams are drained concurrently. On timeout the readers
    /// are stopped, the channel is closed and only [`CommandResult::TimedOut`]
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns [`HostdError::CommandExecution`] when the channel cannot be
    /// opened or the command cannot be issued.
    pub async fn execute(&mut self, command: &str, timeout: Duration) -> HostdResult<CommandResult> {
        let span = tracing::debug_span!(
            span_names::COMMAND_EXECUTE,
            host = %self.connection.host(),
            command = %command,
            timeout_secs = timeout.as_secs()
        );
        self.execute_inner(command, timeout).instrument(span).await
    }

    async fn execute_inner(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> HostdResult<CommandResult> {
        let mut process = self.connection.spawn(command, SpawnMode::Captured).await?;
        let capture = DualStreamCapture::start(process.take_stdout(), process.take_stderr());

        let waited = tokio::time::timeout(timeout, process.wait_eof()).await;
        match waited {
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "Command timed out");
                capture.stop();
                process.close().await;
                drop(capture.join().await);
                Ok(CommandResult::TimedOut {
                    command: command.to_string(),
                    after: timeout,
                })
            }
            Ok(waited) => {
                if let Err(e) = waited {
                    capture.stop();
                    process.close().await;
                    drop(capture.join().await);
                    return Err(HostdError::execution(command, e.to_string()));
                }

                let captured = capture.finish(self.policy.grace_period).await;
                let exit_status = process.exit_status(self.policy.exit_status_wait).await;
                process.close().await;

                let output = CommandOutput {
                    stdout: captured.stdout.text(),
                    stderr: captured.stderr.text(),
                    exit_status,
                };
                tracing::debug!(
                    exit_status = ?output.exit_status,
                    stdout_bytes = output.stdout.len(),
                    stderr_bytes = output.stderr.len(),
                    "Command completed"
                );
                Ok(CommandResult::Completed(output))
            }
        }
    }

    /// Issues `command` without capturing output, then sleeps the policy's
    /// start delay so the remote side can get going.
    ///
    /// # Errors
    ///
    /// Returns [`HostdError::CommandExecution`] when the command cannot be issued.
    pub async fn execute_detached(&mut self, command: &str) -> HostdResult<()> {
        tracing::debug!(host = %self.connection.host(), command = %command, "Starting detached command");
        let mut process = self.connection.spawn(command, SpawnMode::Detached).await?;
        tokio::time::sleep(self.policy.detached_start_delay).await;
        process.close().await;
        Ok(())
    }
}
