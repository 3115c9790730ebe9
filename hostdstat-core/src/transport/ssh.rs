//! SSH transport for hostd probes
//!
//! Opens one SSH session per host with `russh`, negotiates password or
//! keyboard-interactive authentication, and runs each probe command on its
//! own exec channel. Channel messages are pumped by a background task into
//! two in-memory pipes, one for stdout and one for extended-data stream 1
//! (stderr), so the session layer sees two independent readers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, AuthResult, KeyboardInteractiveAuthResponse};
use russh::keys::ssh_key::{HashAlg, PublicKey};
use russh::{Channel, ChannelMsg, Disconnect, MethodKind};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::auth::{AuthMethod, AuthPlan, keyboard_interactive_responses, select_auth_plan};
use super::{Connector, OutputStream, RemoteConnection, RemoteProcess, SpawnMode};
use crate::error::{HostdError, HostdResult};
use crate::host::Host;
use crate::tracing::span_names;

/// Default timeout for TCP connect plus SSH handshake (seconds)
pub const SSH_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Capacity of each stdout/stderr pipe between the channel pump and a reader
const PIPE_CAPACITY: usize = 64 * 1024;

/// Upper bound on keyboard-interactive rounds before giving up
const MAX_KEYBOARD_INTERACTIVE_ROUNDS: usize = 8;

/// How long `close` waits for the pump to acknowledge channel close
const CLOSE_WAIT: Duration = Duration::from_secs(2);

/// SSH stderr is extended data type 1
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Client-side handler; hosts are probed without a known_hosts store
struct ProbeClient {
    host: String,
}

impl client::Handler for ProbeClient {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!(
            host = %self.host,
            fingerprint = %server_public_key.fingerprint(HashAlg::Sha256),
            "Accepting host key"
        );
        Ok(true)
    }
}

/// Connects to hosts over SSH with password-based credentials
#[derive(Debug, Clone)]
pub struct SshConnector {
    connect_timeout: Duration,
    inactivity_timeout: Option<Duration>,
}

impl SshConnector {
    /// Creates a connector with default timeouts
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(SSH_CONNECT_TIMEOUT_SECS),
            inactivity_timeout: None,
        }
    }

    /// Sets the TCP connect plus handshake timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Drops the session after this much inactivity
    #[must_use]
    pub const fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = Some(timeout);
        self
    }

    async fn authenticate(
        handle: &mut client::Handle<ProbeClient>,
        host: &Host,
    ) -> HostdResult<()> {
        let user = host.credentials.username.as_str();
        let password = host.credentials.password();
        let address = host.address.as_str();

        let offered = match handle
            .authenticate_none(user)
            .await
            .map_err(|e| HostdError::connection(address, e.to_string()))?
        {
            AuthResult::Success => {
                tracing::debug!(host = %address, "Server accepted 'none' authentication");
                return Ok(());
            }
            AuthResult::Failure {
                remaining_methods, ..
            } => remaining_methods
                .iter()
                .map(|kind| match kind {
                    MethodKind::Password => AuthMethod::Password,
                    MethodKind::KeyboardInteractive => AuthMethod::KeyboardInteractive,
                    MethodKind::PublicKey => AuthMethod::PublicKey,
                    MethodKind::HostBased => AuthMethod::HostBased,
                    #[allow(unreachable_patterns)]
                    _ => AuthMethod::Other("none".to_string()),
                })
                .collect::<Vec<_>>(),
        };

        let offered = (!offered.is_empty()).then_some(offered);
        if offered.is_none() {
            tracing::debug!(host = %address, "Server did not report authentication methods");
        }

        match select_auth_plan(address, offered.as_deref(), password)? {
            AuthPlan::Password => {
                let result = handle
                    .authenticate_password(user, password)
                    .await
                    .map_err(|e| HostdError::connection(address, e.to_string()))?;
                if result.success() {
                    Ok(())
                } else {
                    Err(HostdError::auth(
                        address,
                        "password based authentication failed",
                    ))
                }
            }
            AuthPlan::KeyboardInteractive => {
                let mut response = handle
                    .authenticate_keyboard_interactive_start(user, None::<String>)
                    .await
                    .map_err(|e| HostdError::connection(address, e.to_string()))?;

                for _ in 0..MAX_KEYBOARD_INTERACTIVE_ROUNDS {
                    match response {
                        KeyboardInteractiveAuthResponse::Success => return Ok(()),
                        KeyboardInteractiveAuthResponse::Failure { .. } => break,
                        KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => {
                            let answers = keyboard_interactive_responses(password, prompts.len());
                            response = handle
                                .authenticate_keyboard_interactive_respond(answers)
                                .await
                                .map_err(|e| HostdError::connection(address, e.to_string()))?;
                        }
                    }
                }

                Err(HostdError::auth(
                    address,
                    "keyboard-interactive based authentication failed",
                ))
            }
        }
    }

    async fn establish(&self, host: &Host) -> HostdResult<Box<dyn RemoteConnection>> {
        tracing::debug!(username = %host.credentials.username, "Opening SSH session");
        let config = Arc::new(client::Config {
            inactivity_timeout: self.inactivity_timeout,
            ..Default::default()
        });
        let handler = ProbeClient {
            host: host.address.clone(),
        };

        let mut handle = tokio::time::timeout(
            self.connect_timeout,
            client::connect(config, (host.address.as_str(), host.port), handler),
        )
        .await
        .map_err(|_| {
            HostdError::connection(
                &host.address,
                format!("timed out after {}s", self.connect_timeout.as_secs()),
            )
        })?
        .map_err(|e| HostdError::connection(&host.address, e.to_string()))?;

        Self::authenticate(&mut handle, host).await?;
        tracing::info!(host = %host.address, "Connected to remote ssh host");

        Ok(Box::new(SshConnection {
            host: host.address.clone(),
            handle: Some(handle),
        }))
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, host: &Host) -> HostdResult<Box<dyn RemoteConnection>> {
        let span = tracing::info_span!(
            span_names::CONNECTION_ESTABLISH,
            host = %host.address,
            port = host.port
        );
        self.establish(host).instrument(span).await
    }
}

/// An authenticated SSH session
pub struct SshConnection {
    host: String,
    handle: Option<client::Handle<ProbeClient>>,
}

#[async_trait]
impl RemoteConnection for SshConnection {
    fn host(&self) -> &str {
        &self.host
    }

    async fn spawn(
        &mut self,
        command: &str,
        mode: SpawnMode,
    ) -> HostdResult<Box<dyn RemoteProcess>> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| HostdError::execution(command, "connection is closed"))?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| HostdError::execution(command, format!("failed to open channel: {e}")))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| HostdError::execution(command, format!("failed to exec: {e}")))?;

        Ok(Box::new(SshProcess::start(channel, mode)))
    }

    async fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
            {
                tracing::debug!(host = %self.host, error = %e, "Disconnect failed");
            }
            tracing::info!(host = %self.host, "SSH connection closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for SshConnection {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let host = std::mem::take(&mut self.host);
        tracing::debug!(host = %host, "Dropping open SSH connection");
        runtime.spawn(async move {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
            {
                tracing::debug!(host = %host, error = %e, "Disconnect failed");
            }
        });
    }
}

/// One exec channel, drained by a background pump
struct SshProcess {
    stdout: Option<OutputStream>,
    stderr: Option<OutputStream>,
    eof_rx: watch::Receiver<bool>,
    stop_tx: Option<oneshot::Sender<()>>,
    pump: Option<JoinHandle<Option<u32>>>,
    exit_status: Option<u32>,
}

impl SshProcess {
    fn start(channel: Channel<client::Msg>, mode: SpawnMode) -> Self {
        let (eof_tx, eof_rx) = watch::channel(false);
        let (stop_tx, stop_rx) = oneshot::channel();

        let (stdout, stderr, sinks) = match mode {
            SpawnMode::Captured => {
                let (out_writer, out_reader) = tokio::io::duplex(PIPE_CAPACITY);
                let (err_writer, err_reader) = tokio::io::duplex(PIPE_CAPACITY);
                (
                    Some(Box::pin(out_reader) as OutputStream),
                    Some(Box::pin(err_reader) as OutputStream),
                    (Some(out_writer), Some(err_writer)),
                )
            }
            SpawnMode::Detached => (None, None, (None, None)),
        };

        let pump = tokio::spawn(pump_channel(channel, sinks.0, sinks.1, eof_tx, stop_rx));

        Self {
            stdout,
            stderr,
            eof_rx,
            stop_tx: Some(stop_tx),
            pump: Some(pump),
            exit_status: None,
        }
    }

    async fn join_pump(&mut self, wait: Duration) {
        if let Some(pump) = self.pump.as_mut() {
            match tokio::time::timeout(wait, pump).await {
                Ok(Ok(status)) => {
                    self.exit_status = self.exit_status.or(status);
                    self.pump = None;
                }
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "Channel pump ended abnormally");
                    self.pump = None;
                }
                Err(_) => {}
            }
        }
    }
}

#[async_trait]
impl RemoteProcess for SshProcess {
    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<OutputStream> {
        self.stderr.take()
    }

    async fn wait_eof(&mut self) -> HostdResult<()> {
        // A dropped sender means the pump is gone, which is end of output too
        let _ = self.eof_rx.wait_for(|eof| *eof).await;
        Ok(())
    }

    async fn exit_status(&mut self, wait: Duration) -> Option<i32> {
        self.join_pump(wait).await;
        self.exit_status
            .map(|code| i32::try_from(code).unwrap_or(i32::MAX))
    }

    async fn close(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        self.join_pump(CLOSE_WAIT).await;
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for SshProcess {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Forwards a data chunk to its pipe, dropping the pipe once its reader is gone
async fn forward(sink: &mut Option<DuplexStream>, data: &[u8]) {
    if let Some(writer) = sink.as_mut()
        && writer.write_all(data).await.is_err()
    {
        *sink = None;
    }
}

/// Routes channel messages to the stdout/stderr pipes until the channel closes
async fn pump_channel(
    mut channel: Channel<client::Msg>,
    mut stdout: Option<DuplexStream>,
    mut stderr: Option<DuplexStream>,
    eof_tx: watch::Sender<bool>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Option<u32> {
    let mut exit_status = None;

    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                if let Err(e) = channel.close().await {
                    tracing::debug!(error = %e, "Channel close failed");
                }
                break;
            }
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { data }) => forward(&mut stdout, &data).await,
                Some(ChannelMsg::ExtendedData { data, ext }) if ext == SSH_EXTENDED_DATA_STDERR => {
                    forward(&mut stderr, &data).await;
                }
                Some(ChannelMsg::ExitStatus { exit_status: code }) => exit_status = Some(code),
                Some(ChannelMsg::Eof) => {
                    stdout = None;
                    stderr = None;
                    eof_tx.send_replace(true);
                }
                Some(ChannelMsg::Close) | None => break,
                Some(_) => {}
            }
        }
    }

    drop(stdout);
    drop(stderr);
    eof_tx.send_replace(true);
    exit_status
}
