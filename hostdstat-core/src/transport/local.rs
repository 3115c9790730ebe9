//! Local shell transport
//!
//! Runs each command through `sh -c` on the machine running the collector.
//! Useful for probing the local hypervisor shell directly and for
//! exercising the capture path against real pipes.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use super::{Connector, OutputStream, RemoteConnection, RemoteProcess, SpawnMode};
use crate::error::{HostdError, HostdResult};
use crate::host::Host;

/// Shell used to interpret probe pipelines
const SHELL: &str = "sh";

/// Connector that ignores credentials and runs commands locally
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalConnector;

#[async_trait]
impl Connector for LocalConnector {
    async fn connect(&self, host: &Host) -> HostdResult<Box<dyn RemoteConnection>> {
        tracing::debug!(host = %host.address, "Using local shell transport");
        Ok(Box::new(LocalConnection::new(host.address.clone())))
    }
}

/// A "connection" to the local shell
#[derive(Debug)]
pub struct LocalConnection {
    host: String,
    closed: bool,
}

impl LocalConnection {
    /// Creates a local connection labelled with `host`
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            closed: false,
        }
    }
}

#[async_trait]
impl RemoteConnection for LocalConnection {
    fn host(&self) -> &str {
        &self.host
    }

    async fn spawn(
        &mut self,
        command: &str,
        mode: SpawnMode,
    ) -> HostdResult<Box<dyn RemoteProcess>> {
        if self.closed {
            return Err(HostdError::execution(command, "connection is closed"));
        }

        Ok(Box::new(LocalProcess::start(command, mode)?))
    }

    async fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

struct LocalProcess {
    /// `None` once a detached child has been handed to its reaper
    child: Option<Child>,
    mode: SpawnMode,
    stdout: Option<OutputStream>,
    stderr: Option<OutputStream>,
    status: Option<ExitStatus>,
}

impl LocalProcess {
    fn start(command: &str, mode: SpawnMode) -> HostdResult<Self> {
        let mut cmd = Command::new(SHELL);
        cmd.arg("-c").arg(command).stdin(Stdio::null());
        match mode {
            SpawnMode::Captured => {
                cmd.stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .kill_on_drop(true);
            }
            SpawnMode::Detached => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| HostdError::execution(command, format!("failed to spawn shell: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .map(|out| Box::pin(out) as OutputStream);
        let stderr = child
            .stderr
            .take()
            .map(|err| Box::pin(err) as OutputStream);

        Ok(Self {
            child: Some(child),
            mode,
            stdout,
            stderr,
            status: None,
        })
    }
}

/// Waits out a detached command so it does not linger as a zombie
async fn reap(mut child: Child) {
    match child.wait().await {
        Ok(status) => tracing::debug!(status = %status, "Detached local command exited"),
        Err(e) => tracing::debug!(error = %e, "Failed to reap detached local command"),
    }
}

#[async_trait]
impl RemoteProcess for LocalProcess {
    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<OutputStream> {
        self.stderr.take()
    }

    async fn wait_eof(&mut self) -> HostdResult<()> {
        if self.status.is_none()
            && let Some(child) = self.child.as_mut()
        {
            self.status = Some(child.wait().await?);
        }
        Ok(())
    }

    async fn exit_status(&mut self, wait: Duration) -> Option<i32> {
        if self.status.is_none()
            && let Some(child) = self.child.as_mut()
            && let Ok(Ok(status)) = tokio::time::timeout(wait, child.wait()).await
        {
            self.status = Some(status);
        }
        // Killed by a signal yields no code, like a channel that never reported one
        self.status.and_then(|status| status.code())
    }

    async fn close(&mut self) {
        if self.status.is_some() {
            return;
        }
        if self.mode == SpawnMode::Detached {
            // Left running on purpose; the reaper collects its exit
            if let Some(child) = self.child.take() {
                tokio::spawn(reap(child));
            }
            return;
        }
        let Some(child) = self.child.as_mut() else {
            return;
        };
        if let Err(e) = child.start_kill() {
            tracing::debug!(error = %e, "Failed to kill local command");
            return;
        }
        match child.wait().await {
            Ok(status) => self.status = Some(status),
            Err(e) => tracing::debug!(error = %e, "Failed to reap local command"),
        }
    }
}
