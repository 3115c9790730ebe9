//! Stats collection across hosts
//!
//! For each host the collector connects, runs the memory, thread, fd and
//! responsiveness probes over that one connection, closes it, and emits a
//! [`HostReport`]. A host that cannot be reached still gets a report with
//! every metric unknown; only an empty host list or a cycle where no host
//! connected is an error.

pub mod report;
pub mod state;

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::Instrument;

pub use report::{BandCounts, CollectionSummary, ConnectionOutcome, HostReport};
pub use state::{HostState, StateTrace};

use crate::error::{HostdError, HostdResult};
use crate::host::Host;
use crate::probe::{Metric, MetricKind, MetricProbe, ProbeCommands};
use crate::session::{CommandSession, ExecPolicy};
use crate::tracing::span_names;
use crate::transport::{Connector, RemoteConnection};

/// Default per-command timeout (seconds)
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Default number of hosts collected at once
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Tunables for one collector
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Bound on each probe command
    pub command_timeout: Duration,
    /// Hosts processed at once; reports keep input order regardless
    pub concurrency: usize,
    /// Session policy shared by every command
    pub policy: ExecPolicy,
    /// Probe pipelines
    pub commands: ProbeCommands,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            policy: ExecPolicy::default(),
            commands: ProbeCommands::default(),
        }
    }
}

impl CollectorOptions {
    /// Sets the per-command timeout
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets how many hosts run at once (at least 1)
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the session policy
    #[must_use]
    pub fn with_policy(mut self, policy: ExecPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the probe pipelines
    #[must_use]
    pub fn with_commands(mut self, commands: ProbeCommands) -> Self {
        self.commands = commands;
        self
    }
}

/// Probes hosts through a [`Connector`]
pub struct StatsCollector<C> {
    connector: C,
    options: CollectorOptions,
    probes: Vec<MetricProbe>,
}

impl<C: Connector> StatsCollector<C> {
    /// Creates a collector running the standard probe set
    pub fn new(connector: C, options: CollectorOptions) -> Self {
        let probes = MetricProbe::standard_set(&options.commands);
        Self {
            connector,
            options,
            probes,
        }
    }

    /// The options in effect
    #[must_use]
    pub const fn options(&self) -> &CollectorOptions {
        &self.options
    }

    /// Collects every host, in order.
    ///
    /// # Errors
    ///
    /// [`HostdError::NoHosts`] for an empty list and
    /// [`HostdError::AllHostsFailed`] when no host could be connected.
    pub async fn collect(&self, hosts: &[Host]) -> HostdResult<CollectionSummary> {
        self.collect_with(hosts, |_| {}).await
    }

    /// Like [`StatsCollector::collect`], handing each report to `sink` as
    /// soon as it is ready.
    ///
    /// # Errors
    ///
    /// Same as [`StatsCollector::collect`]. Reports of a cycle in which every
    /// host failed have already been passed to `sink`.
    pub async fn collect_with<F>(&self, hosts: &[Host], mut sink: F) -> HostdResult<CollectionSummary>
    where
        F: FnMut(&HostReport),
    {
        if hosts.is_empty() {
            return Err(HostdError::NoHosts);
        }

        tracing::info!(
            hosts = hosts.len(),
            concurrency = self.options.concurrency,
            "Starting collection"
        );

        let mut summary = CollectionSummary::new();
        let mut reports = stream::iter(hosts)
            .map(|host| self.collect_host(host))
            .buffered(self.options.concurrency.max(1));

        while let Some(report) = reports.next().await {
            sink(&report);
            summary.add_report(report);
        }

        tracing::info!(
            total = summary.total,
            connected = summary.connected,
            failed = summary.failed,
            "Collection finished"
        );

        if summary.all_failed() {
            return Err(HostdError::AllHostsFailed {
                total: summary.total,
            });
        }
        Ok(summary)
    }

    /// Connects to one host, runs all probes, and assembles its report.
    ///
    /// Never fails; connect errors are recorded in the report.
    pub async fn collect_host(&self, host: &Host) -> HostReport {
        let span = tracing::info_span!(span_names::HOST_COLLECT, host = %host);
        async {
            let mut states = StateTrace::new();
            states.advance(&host.address, HostState::Connecting);

            let mut connection = match self.connector.connect(host).await {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to connect");
                    states.advance(&host.address, HostState::ConnectFailed);
                    states.advance(&host.address, HostState::Reported);
                    return HostReport::connect_failed(&host.address, &e, states);
                }
            };
            states.advance(&host.address, HostState::Connected);

            states.advance(&host.address, HostState::Probing);
            let mut metrics = self.run_probes(connection.as_mut()).await;
            connection.close().await;
            states.advance(&host.address, HostState::Classified);

            let mut pick = |kind: MetricKind| {
                metrics
                    .iter()
                    .position(|m| m.kind == kind)
                    .map(|i| metrics.swap_remove(i))
                    .unwrap_or_else(|| Metric::unknown(kind, "not probed"))
            };
            let memory = pick(MetricKind::Memory);
            let thread = pick(MetricKind::Thread);
            let fd = pick(MetricKind::FileDescriptor);
            let responsiveness = pick(MetricKind::Responsiveness);

            states.advance(&host.address, HostState::Reported);
            HostReport {
                host: host.address.clone(),
                connection: ConnectionOutcome::Connected,
                memory,
                thread,
                fd,
                responsiveness,
                collected_at: chrono::Utc::now(),
                states,
            }
        }
        .instrument(span)
        .await
    }

    async fn run_probes(&self, connection: &mut dyn RemoteConnection) -> Vec<Metric> {
        let mut session = CommandSession::new(connection, &self.options.policy);
        let mut metrics = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            metrics.push(probe.run(&mut session, self.options.command_timeout).await);
        }
        metrics
    }
}
