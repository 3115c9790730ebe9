//! Remote command transports
//!
//! A [`Connector`] authenticates against a [`Host`] and yields a
//! [`RemoteConnection`]. Each command runs on its own [`RemoteProcess`]
//! channel, which exposes stdout and stderr as two independent byte streams
//! so the session layer can drain them concurrently.
//!
//! Two transports are provided: [`ssh`] (the production path) and
//! [`local`], which runs pipelines through the local shell.

pub mod auth;
pub mod local;
pub mod ssh;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::HostdResult;
use crate::host::Host;

pub use auth::{AuthMethod, AuthPlan, keyboard_interactive_responses, select_auth_plan};
pub use local::{LocalConnection, LocalConnector};
pub use ssh::{SshConnection, SshConnector};

/// One output stream of a remote process
pub type OutputStream = Pin<Box<dyn AsyncRead + Send>>;

/// How a command's output is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    /// Both output streams are exposed for capture
    Captured,
    /// Output is discarded and the process may outlive the channel
    Detached,
}

/// A command running on a remote channel
#[async_trait]
pub trait RemoteProcess: Send {
    /// Takes the standard output stream (available once, `Captured` mode only)
    fn take_stdout(&mut self) -> Option<OutputStream>;

    /// Takes the standard error stream (available once, `Captured` mode only)
    fn take_stderr(&mut self) -> Option<OutputStream>;

    /// Resolves when the remote side signals end of output.
    ///
    /// Cancel-safe: the session races this against its timeout.
    async fn wait_eof(&mut self) -> HostdResult<()>;

    /// Exit status, waiting at most `wait` for the remote to report it.
    ///
    /// `None` when the remote never reported one.
    async fn exit_status(&mut self, wait: Duration) -> Option<i32>;

    /// Closes the channel. Idempotent.
    async fn close(&mut self);
}

/// An authenticated connection to one host
#[async_trait]
pub trait RemoteConnection: Send {
    /// Address of the connected host
    fn host(&self) -> &str;

    /// Issues `command` on a fresh channel
    async fn spawn(
        &mut self,
        command: &str,
        mode: SpawnMode,
    ) -> HostdResult<Box<dyn RemoteProcess>>;

    /// Releases the connection. Safe to call more than once.
    async fn close(&mut self);

    /// Returns true once [`RemoteConnection::close`] has run
    fn is_closed(&self) -> bool;
}

/// Opens connections to hosts
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects and authenticates.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HostdError::Connection`] for transport failures and
    /// [`crate::HostdError::Authentication`] when no credentials are accepted.
    async fn connect(&self, host: &Host) -> HostdResult<Box<dyn RemoteConnection>>;
}
