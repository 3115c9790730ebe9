//! Metric collection command.

use std::path::Path;

use hostdstat_core::host::Host;
use hostdstat_core::transport::Connector;
use hostdstat_core::{
    CollectionSummary, HostReport, HostdError, LocalConnector, Settings, SshConnector,
    StatsCollector,
};
use secrecy::SecretString;

use crate::cli::{CollectArgs, OutputFormat};
use crate::error::CliError;
use crate::format::{TextFormatter, json_summary};
use crate::util::{hosts_from_specs, load_settings, parse_hosts_file, resolve_password};

/// Collect command handler
pub fn cmd_collect(
    config_path: Option<&Path>,
    args: &CollectArgs,
    color: bool,
) -> Result<(), CliError> {
    let mut settings = load_settings(config_path)?;
    apply_overrides(&mut settings, args)?;

    let specs = host_specs(args)?;
    if specs.is_empty() && settings.hosts.is_empty() {
        return Err(CliError::Input(
            "no hosts given; use --host, --hosts-file or [[hosts]] in the config".to_string(),
        ));
    }

    let password = if args.local {
        SecretString::from(String::new())
    } else {
        resolve_password(args.password.as_deref(), &args.username)?
    };
    let hosts = build_hosts(&settings, &specs, &args.username, &password)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Collection(format!("Failed to create async runtime: {e}")))?;
    let options = settings.collector_options();
    let formatter = TextFormatter::new(color);

    if args.local {
        let collector = StatsCollector::new(LocalConnector, options);
        run(&runtime, &collector, &hosts, args.format, formatter)
    } else {
        // A channel silent for longer than any command may run is dead
        let connector = SshConnector::new()
            .with_connect_timeout(settings.collector.connect_timeout())
            .with_inactivity_timeout(
                settings.collector.command_timeout() + settings.collector.connect_timeout(),
            );
        let collector = StatsCollector::new(connector, options);
        run(&runtime, &collector, &hosts, args.format, formatter)
    }
}

/// Command-line timeouts and concurrency win over the config file
fn apply_overrides(settings: &mut Settings, args: &CollectArgs) -> Result<(), CliError> {
    if let Some(secs) = args.command_timeout {
        settings.collector.command_timeout_secs = secs;
    }
    if let Some(secs) = args.connect_timeout {
        settings.collector.connect_timeout_secs = secs;
    }
    if let Some(concurrency) = args.concurrency {
        settings.collector.concurrency = concurrency;
    }
    settings.validate()?;
    Ok(())
}

/// `--host` values followed by the hosts file
fn host_specs(args: &CollectArgs) -> Result<Vec<String>, CliError> {
    let mut specs = args.hosts.clone();
    if let Some(path) = &args.hosts_file {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Input(format!("Failed to read hosts file {}: {e}", path.display()))
        })?;
        specs.extend(parse_hosts_file(&content));
    }
    Ok(specs)
}

/// Command-line hosts first, then `[[hosts]]` entries not already listed
fn build_hosts(
    settings: &Settings,
    specs: &[String],
    username: &str,
    password: &SecretString,
) -> Result<Vec<Host>, CliError> {
    let mut hosts = hosts_from_specs(specs, settings.collector.port, username, password)?;
    for host in settings.configured_hosts(username, password) {
        if !hosts.iter().any(|h| h.address == host.address && h.port == host.port) {
            hosts.push(host);
        }
    }
    Ok(hosts)
}

fn run<C: Connector>(
    runtime: &tokio::runtime::Runtime,
    collector: &StatsCollector<C>,
    hosts: &[Host],
    format: OutputFormat,
    formatter: TextFormatter,
) -> Result<(), CliError> {
    let mut reports: Vec<HostReport> = Vec::with_capacity(hosts.len());
    let result = runtime.block_on(collector.collect_with(hosts, |report| {
        if format == OutputFormat::Text {
            print!("{}", formatter.host_report(report));
        }
        reports.push(report.clone());
    }));

    let failure = match result {
        Ok(_) => None,
        Err(e @ HostdError::AllHostsFailed { .. }) => Some(e),
        Err(e) => return Err(e.into()),
    };

    let summary = CollectionSummary::from_reports(reports);
    match format {
        OutputFormat::Text => println!("\n{}", formatter.summary(&summary)),
        OutputFormat::Json => println!("{}", json_summary(&summary)?),
    }

    failure.map_or(Ok(()), |e| Err(e.into()))
}
