//! Collector tests against scripted hosts

use std::time::Duration;

use hostdstat_core::collector::{CollectorOptions, HostState};
use hostdstat_core::probe::commands::{
    FD_LIMIT_COMMAND, FD_USAGE_COMMAND, MEMORY_LIMIT_COMMAND, MEMORY_USAGE_COMMAND,
    RESPONSIVENESS_COMMAND, THREAD_LIMIT_COMMAND, THREAD_USAGE_COMMAND,
};
use hostdstat_core::testing::{HostScript, ScriptedConnector, ScriptedReply};
use hostdstat_core::{
    Band, ConnectionOutcome, Credentials, ExecPolicy, Host, HostdError, StatsCollector,
};

fn host(address: &str) -> Host {
    Host::new(address, Credentials::new("root", "secret"))
}

fn options() -> CollectorOptions {
    CollectorOptions::default()
        .with_command_timeout(Duration::from_millis(500))
        .with_policy(ExecPolicy {
            grace_period: Duration::from_millis(100),
            ..ExecPolicy::default()
        })
}

/// Replies of a healthy host with the given memory usage
fn healthy_host(memory_usage: &str) -> Vec<(&'static str, ScriptedReply)> {
    vec![
        (MEMORY_USAGE_COMMAND, ScriptedReply::stdout(memory_usage)),
        (MEMORY_LIMIT_COMMAND, ScriptedReply::stdout("50.00 MB\n")),
        (THREAD_USAGE_COMMAND, ScriptedReply::stdout("3\n")),
        (THREAD_LIMIT_COMMAND, ScriptedReply::stdout("20\n")),
        (FD_USAGE_COMMAND, ScriptedReply::stdout("       412\n")),
        (FD_LIMIT_COMMAND, ScriptedReply::stdout("4096\n")),
        (RESPONSIVENESS_COMMAND, ScriptedReply::empty(1)),
    ]
}

fn replace(
    mut replies: Vec<(&'static str, ScriptedReply)>,
    command: &str,
    reply: ScriptedReply,
) -> Vec<(&'static str, ScriptedReply)> {
    for (cmd, r) in &mut replies {
        if *cmd == command {
            *r = reply.clone();
        }
    }
    replies
}

#[tokio::test]
async fn test_memory_green_at_84_percent() {
    let connector = ScriptedConnector::new().host("esx1", healthy_host("42.00 MB\n"));
    let collector = StatsCollector::new(connector, options());

    let report = collector.collect_host(&host("esx1")).await;
    assert_eq!(report.connection, ConnectionOutcome::Connected);
    assert_eq!(report.memory.usage, Some(42.0));
    assert_eq!(report.memory.limit, Some(50.0));
    assert_eq!(report.memory.percent(), Some(84.0));
    assert_eq!(report.memory.band, Band::Green);
    assert!(!report.memory.at_limit());
}

#[tokio::test]
async fn test_memory_red_at_96_percent() {
    let connector = ScriptedConnector::new().host("esx1", healthy_host("48.00 MB\n"));
    let collector = StatsCollector::new(connector, options());

    let report = collector.collect_host(&host("esx1")).await;
    assert_eq!(report.memory.percent(), Some(96.0));
    assert_eq!(report.memory.band, Band::Red);
    assert_eq!(report.worst_band(), Band::Red);
}

#[tokio::test]
async fn test_memory_at_limit_flag() {
    let connector = ScriptedConnector::new().host("esx1", healthy_host("50.00 MB\n"));
    let collector = StatsCollector::new(connector, options());

    let report = collector.collect_host(&host("esx1")).await;
    assert!(report.memory.at_limit());
    assert_eq!(report.memory.band, Band::Red);
}

#[tokio::test]
async fn test_failed_memory_probe_does_not_stop_others() {
    let replies = replace(
        healthy_host("42.00 MB\n"),
        MEMORY_USAGE_COMMAND,
        ScriptedReply::stderr("esxcfg-resgrp: group not found\n", 1),
    );
    let connector = ScriptedConnector::new().host("esx1", replies);
    let log = connector.log();
    let collector = StatsCollector::new(connector, options());

    let report = collector.collect_host(&host("esx1")).await;
    assert_eq!(report.memory.band, Band::Unknown);
    assert!(report.memory.error.as_deref().unwrap().contains("group not found"));
    assert_eq!(report.memory.limit, Some(50.0));

    assert_eq!(report.thread.band, Band::Green);
    assert_eq!(report.fd.band, Band::Green);
    assert_eq!(report.responsiveness.responsive(), Some(true));
    assert_eq!(log.commands_for("esx1").len(), 7);
}

#[tokio::test]
async fn test_empty_thread_usage_is_zero() {
    let replies = replace(
        healthy_host("42.00 MB\n"),
        THREAD_USAGE_COMMAND,
        ScriptedReply::empty(1),
    );
    let connector = ScriptedConnector::new().host("esx1", replies);
    let collector = StatsCollector::new(connector, options());

    let report = collector.collect_host(&host("esx1")).await;
    assert_eq!(report.thread.usage, Some(0.0));
    assert_eq!(report.thread.band, Band::Green);
}

#[tokio::test]
async fn test_responsiveness_marker_means_unresponsive() {
    let replies = replace(
        healthy_host("42.00 MB\n"),
        RESPONSIVENESS_COMMAND,
        ScriptedReply::stdout("2024-05-01T10:00:00Z hostd detected to be non-responsive\n"),
    );
    let connector = ScriptedConnector::new().host("esx1", replies);
    let collector = StatsCollector::new(connector, options());

    let report = collector.collect_host(&host("esx1")).await;
    assert_eq!(report.responsiveness.band, Band::Red);
    assert_eq!(report.responsiveness.responsive(), Some(false));
}

#[tokio::test]
async fn test_allow_listed_stderr_keeps_value() {
    let replies = replace(
        healthy_host("42.00 MB\n"),
        FD_LIMIT_COMMAND,
        ScriptedReply::stdout("4096\n").with_stderr("Terminating watchdog process with PID 77\n"),
    );
    let connector = ScriptedConnector::new().host("esx1", replies);
    let collector = StatsCollector::new(connector, options());

    let report = collector.collect_host(&host("esx1")).await;
    assert_eq!(report.fd.limit, Some(4096.0));
    assert_eq!(report.fd.band, Band::Green);
}

#[tokio::test]
async fn test_timed_out_probe_is_unknown() {
    let replies = replace(
        healthy_host("42.00 MB\n"),
        FD_USAGE_COMMAND,
        ScriptedReply::stdout("412\n").with_delay(Duration::from_secs(5)),
    );
    let connector = ScriptedConnector::new().host("esx1", replies);
    let collector = StatsCollector::new(connector, options());

    let report = collector.collect_host(&host("esx1")).await;
    assert_eq!(report.fd.band, Band::Unknown);
    assert!(report.fd.usage.is_none());
    assert!(report.fd.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(report.memory.band, Band::Green);
}

#[tokio::test]
async fn test_unreachable_host_does_not_stop_next() {
    let connector = ScriptedConnector::new()
        .failing_host("esx-a", HostScript::Unreachable("connection refused".into()))
        .host("esx-b", healthy_host("42.00 MB\n"));
    let log = connector.log();
    let collector = StatsCollector::new(connector, options());

    let mut seen = Vec::new();
    let summary = collector
        .collect_with(&[host("esx-a"), host("esx-b")], |report| {
            seen.push(report.host.clone());
        })
        .await
        .unwrap();

    assert_eq!(seen, ["esx-a", "esx-b"]);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.connected, 1);
    assert_eq!(summary.failed, 1);

    let failed = &summary.reports[0];
    assert!(matches!(failed.connection, ConnectionOutcome::ConnectionFailed(_)));
    assert!(failed.metrics().iter().all(|m| m.band == Band::Unknown));
    assert!(failed.states.is_valid());
    assert_eq!(failed.states.current(), HostState::Reported);

    let ok = &summary.reports[1];
    assert_eq!(ok.memory.band, Band::Green);
    assert!(ok.states.is_valid());
    assert!(ok.states.states().contains(&HostState::Classified));

    assert!(log.commands_for("esx-a").is_empty());
    assert_eq!(log.closes_for("esx-b"), 1);
}

#[tokio::test]
async fn test_auth_failure_recorded() {
    let connector = ScriptedConnector::new()
        .failing_host("esx1", HostScript::RefuseAuth("no compatible method".into()))
        .host("esx2", healthy_host("42.00 MB\n"));
    let collector = StatsCollector::new(connector, options());

    let summary = collector
        .collect(&[host("esx1"), host("esx2")])
        .await
        .unwrap();
    assert_eq!(
        summary.reports[0].connection,
        ConnectionOutcome::AuthenticationFailed("no compatible method".to_string())
    );
}

#[tokio::test]
async fn test_all_hosts_failing_is_an_error() {
    let connector = ScriptedConnector::new()
        .failing_host("esx1", HostScript::Unreachable("timed out".into()))
        .failing_host("esx2", HostScript::RefuseAuth("password rejected".into()));
    let collector = StatsCollector::new(connector, options());

    let mut emitted = 0;
    let err = collector
        .collect_with(&[host("esx1"), host("esx2")], |_| emitted += 1)
        .await
        .unwrap_err();
    assert!(matches!(err, HostdError::AllHostsFailed { total: 2 }));
    assert_eq!(emitted, 2);
}

#[tokio::test]
async fn test_empty_host_list_is_an_error() {
    let collector = StatsCollector::new(ScriptedConnector::new(), options());
    let err = collector.collect(&[]).await.unwrap_err();
    assert!(matches!(err, HostdError::NoHosts));
}

#[tokio::test]
async fn test_parallel_collection_keeps_order() {
    let slow = replace(
        healthy_host("42.00 MB\n"),
        MEMORY_USAGE_COMMAND,
        ScriptedReply::stdout("42.00 MB\n").with_delay(Duration::from_millis(200)),
    );
    let connector = ScriptedConnector::new()
        .host("esx1", slow)
        .host("esx2", healthy_host("48.00 MB\n"))
        .host("esx3", healthy_host("45.00 MB\n"));
    let collector = StatsCollector::new(connector, options().with_concurrency(3));

    let summary = collector
        .collect(&[host("esx1"), host("esx2"), host("esx3")])
        .await
        .unwrap();
    let order: Vec<_> = summary.reports.iter().map(|r| r.host.as_str()).collect();
    assert_eq!(order, ["esx1", "esx2", "esx3"]);
    assert_eq!(summary.reports[2].memory.band, Band::Warning);
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let connector = ScriptedConnector::new().host("esx1", healthy_host("42.00 MB\n"));
    let collector = StatsCollector::new(connector, options());

    let summary = collector.collect(&[host("esx1")]).await.unwrap();
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["reports"][0]["memory"]["band"], "GREEN");
    assert_eq!(json["reports"][0]["connection"]["outcome"], "connected");
    assert_eq!(json["connected"], 1);
}
