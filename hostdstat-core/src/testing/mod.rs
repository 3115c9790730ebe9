//! Scripted transport for exercising the collector without a live host
//!
//! [`ScriptedConnector`] maps host addresses to either a connect error or a
//! table of canned command replies. Every spawned command and every close is
//! appended to a shared [`ScriptLog`] so tests can assert on what ran.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{HostdError, HostdResult};
use crate::host::Host;
use crate::transport::{
    Connector, OutputStream, RemoteConnection, RemoteProcess, SpawnMode,
};

/// Exit status reported for commands missing from a script
pub const UNKNOWN_COMMAND_STATUS: i32 = 127;

/// Canned reply to one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedReply {
    /// Bytes written to stdout
    pub stdout: String,
    /// Bytes written to stderr
    pub stderr: String,
    /// Exit status, `None` for a channel that never reports one
    pub exit_status: Option<i32>,
    /// How long the command "runs" before end of output
    pub delay: Duration,
}

impl ScriptedReply {
    /// Clean exit with the given stdout
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_status: Some(0),
            ..Self::default()
        }
    }

    /// Empty output with the given exit status (`grep` with no match is 1)
    #[must_use]
    pub fn empty(exit_status: i32) -> Self {
        Self {
            exit_status: Some(exit_status),
            ..Self::default()
        }
    }

    /// Failing command with the given stderr
    pub fn stderr(stderr: impl Into<String>, exit_status: i32) -> Self {
        Self {
            stderr: stderr.into(),
            exit_status: Some(exit_status),
            ..Self::default()
        }
    }

    /// Adds stderr noise to the reply
    #[must_use]
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Delays end of output
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// What a scripted host does on connect
#[derive(Debug, Clone)]
pub enum HostScript {
    /// Authentication is refused with this reason
    RefuseAuth(String),
    /// The host is unreachable with this reason
    Unreachable(String),
    /// The host accepts and answers from this table
    Commands(HashMap<String, ScriptedReply>),
}

/// Event recorded by scripted connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEvent {
    /// A connect attempt
    Connect(String),
    /// A command spawned on a host
    Spawn {
        /// Host address
        host: String,
        /// Command text
        command: String,
        /// Spawn mode
        mode: SpawnMode,
    },
    /// A connection closed
    Close(String),
}

/// Shared, append-only event log
#[derive(Debug, Clone, Default)]
pub struct ScriptLog(Arc<Mutex<Vec<ScriptEvent>>>);

impl ScriptLog {
    fn push(&self, event: ScriptEvent) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Snapshot of all events so far
    #[must_use]
    pub fn events(&self) -> Vec<ScriptEvent> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Commands spawned on `host`, in order
    #[must_use]
    pub fn commands_for(&self, host: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ScriptEvent::Spawn { host: h, command, .. } if h == host => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Number of closes recorded for `host`
    #[must_use]
    pub fn closes_for(&self, host: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ScriptEvent::Close(h) if h == host))
            .count()
    }
}

/// Connector answering from per-host scripts
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    hosts: HashMap<String, HostScript>,
    log: ScriptLog,
}

impl ScriptedConnector {
    /// Creates a connector with no hosts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reachable host answering from `replies`
    #[must_use]
    pub fn host<I, S>(mut self, address: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = (S, ScriptedReply)>,
        S: Into<String>,
    {
        let table = replies
            .into_iter()
            .map(|(command, reply)| (command.into(), reply))
            .collect();
        self.hosts.insert(address.into(), HostScript::Commands(table));
        self
    }

    /// Adds a host whose connect fails with `script`
    #[must_use]
    pub fn failing_host(mut self, address: impl Into<String>, script: HostScript) -> Self {
        self.hosts.insert(address.into(), script);
        self
    }

    /// The shared event log
    #[must_use]
    pub fn log(&self) -> ScriptLog {
        self.log.clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, host: &Host) -> HostdResult<Box<dyn RemoteConnection>> {
        self.log.push(ScriptEvent::Connect(host.address.clone()));
        match self.hosts.get(&host.address) {
            None => Err(HostdError::connection(&host.address, "no route to host")),
            Some(HostScript::Unreachable(reason)) => {
                Err(HostdError::connection(&host.address, reason.clone()))
            }
            Some(HostScript::RefuseAuth(reason)) => {
                Err(HostdError::auth(&host.address, reason.clone()))
            }
            Some(HostScript::Commands(table)) => Ok(Box::new(ScriptedConnection {
                host: host.address.clone(),
                table: table.clone(),
                log: self.log.clone(),
                closed: false,
            })),
        }
    }
}

struct ScriptedConnection {
    host: String,
    table: HashMap<String, ScriptedReply>,
    log: ScriptLog,
    closed: bool,
}

#[async_trait]
impl RemoteConnection for ScriptedConnection {
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
        self.log.push(ScriptEvent::Spawn {
            host: self.host.clone(),
            command: command.to_string(),
            mode,
        });

        let reply = self.table.get(command).cloned().unwrap_or_else(|| {
            ScriptedReply::stderr(format!("sh: {command}: not found\n"), UNKNOWN_COMMAND_STATUS)
        });
        let (stdout, stderr) = match mode {
            SpawnMode::Captured => (
                Some(Box::pin(Cursor::new(reply.stdout.into_bytes())) as OutputStream),
                Some(Box::pin(Cursor::new(reply.stderr.into_bytes())) as OutputStream),
            ),
            SpawnMode::Detached => (None, None),
        };

        Ok(Box::new(ScriptedProcess {
            stdout,
            stderr,
            exit_status: reply.exit_status,
            delay: reply.delay,
        }))
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.log.push(ScriptEvent::Close(self.host.clone()));
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

struct ScriptedProcess {
    stdout: Option<OutputStream>,
    stderr: Option<OutputStream>,
    exit_status: Option<i32>,
    delay: Duration,
}

#[async_trait]
impl RemoteProcess for ScriptedProcess {
    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<OutputStream> {
        self.stderr.take()
    }

    async fn wait_eof(&mut self) -> HostdResult<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn exit_status(&mut self, _wait: Duration) -> Option<i32> {
        self.exit_status
    }

    async fn close(&mut self) {}
}
