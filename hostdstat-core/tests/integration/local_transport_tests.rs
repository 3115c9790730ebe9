//! Command engine tests against the local shell

use std::time::{Duration, Instant};

use hostdstat_core::collector::CollectorOptions;
use hostdstat_core::transport::{LocalConnection, LocalConnector};
use hostdstat_core::{
    Band, CommandResult, CommandSession, Credentials, ExecPolicy, Host, ProbeCommands,
    StatsCollector, StderrAllowList,
};

fn fast_policy() -> ExecPolicy {
    ExecPolicy {
        grace_period: Duration::from_millis(500),
        detached_start_delay: Duration::from_millis(200),
        ..ExecPolicy::default()
    }
}

#[tokio::test]
async fn test_megabyte_on_both_streams_does_not_hang() {
    let mut conn = LocalConnection::new("localhost");
    let policy = fast_policy();
    let mut session = CommandSession::new(&mut conn, &policy);

    // 16 x 64 KiB on each stream, alternating so both pipes fill up
    let command = "for i in $(seq 1 16); do \
                   head -c 65536 /dev/zero | tr '\\0' o; \
                   head -c 65536 /dev/zero | tr '\\0' e >&2; \
                   done";

    let result = tokio::time::timeout(
        Duration::from_secs(60),
        session.execute(command, Duration::from_secs(30)),
    )
    .await
    .expect("dual-stream capture must not deadlock")
    .unwrap();

    let output = match result {
        CommandResult::Completed(output) => output,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(output.stdout.len(), 16 * 65536);
    assert_eq!(output.stderr.len(), 16 * 65536);
    assert!(output.stdout.bytes().all(|b| b == b'o'));
    assert!(output.stderr.bytes().all(|b| b == b'e'));
    assert_eq!(output.exit_status, Some(0));
}

#[tokio::test]
async fn test_timeout_returns_no_output() {
    let mut conn = LocalConnection::new("localhost");
    let policy = fast_policy();
    let mut session = CommandSession::new(&mut conn, &policy);

    let started = Instant::now();
    let result = session
        .execute("echo partial; sleep 5", Duration::from_millis(200))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    match result {
        CommandResult::TimedOut { command, after } => {
            assert_eq!(command, "echo partial; sleep 5");
            assert_eq!(after, Duration::from_millis(200));
        }
        CommandResult::Completed(output) => panic!("expected timeout, got {output:?}"),
    }
}

#[tokio::test]
async fn test_session_usable_after_timeout() {
    let mut conn = LocalConnection::new("localhost");
    let policy = fast_policy();
    let mut session = CommandSession::new(&mut conn, &policy);

    let first = session
        .execute("sleep 5", Duration::from_millis(100))
        .await
        .unwrap();
    assert!(first.output().is_none());

    let second = session.execute("echo 7", Duration::from_secs(5)).await.unwrap();
    assert_eq!(second.output().unwrap().stdout, "7\n");
}

#[tokio::test]
async fn test_exit_status_and_stderr_rules() {
    let mut conn = LocalConnection::new("localhost");
    let policy = fast_policy();
    let allow = StderrAllowList::default();
    let mut session = CommandSession::new(&mut conn, &policy);

    let failed = session.execute("exit 3", Duration::from_secs(5)).await.unwrap();
    assert_eq!(failed.output().unwrap().exit_status, Some(3));
    assert!(!failed.is_success(&allow));

    let noisy = session
        .execute(
            "echo 5; echo 'Picked up JAVA_TOOL_OPTIONS: -Xmx64m' >&2",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert!(noisy.is_success(&allow));

    let dirty = session
        .execute("echo 5; echo 'vsish: error' >&2", Duration::from_secs(5))
        .await
        .unwrap();
    assert!(!dirty.is_success(&allow));
}

#[tokio::test]
async fn test_detached_command_runs() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("started");

    let mut conn = LocalConnection::new("localhost");
    let policy = fast_policy();
    let mut session = CommandSession::new(&mut conn, &policy);

    let started = Instant::now();
    session
        .execute_detached(&format!("touch '{}'", marker.display()))
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(marker.exists());
}

#[tokio::test]
async fn test_collector_over_local_shell() {
    let commands = ProbeCommands {
        memory_usage: "echo '42.00 MB'".to_string(),
        memory_limit: "echo '50.00 MB'".to_string(),
        thread_usage: "grep busy_long /dev/null".to_string(),
        thread_limit: "echo 128".to_string(),
        fd_usage: "printf '  17\\n'".to_string(),
        fd_limit: "expr 2048 + 64 \\* 2".to_string(),
        responsiveness: "grep 'non-responsive' /dev/null".to_string(),
    };
    let options = CollectorOptions::default()
        .with_command_timeout(Duration::from_secs(10))
        .with_policy(fast_policy())
        .with_commands(commands);
    let collector = StatsCollector::new(LocalConnector, options);

    let hosts = [Host::new("localhost", Credentials::new("root", ""))];
    let summary = collector.collect(&hosts).await.unwrap();
    let report = &summary.reports[0];

    assert_eq!(report.memory.band, Band::Green);
    assert_eq!(report.thread.usage, Some(0.0));
    assert_eq!(report.thread.band, Band::Green);
    assert_eq!(report.fd.usage, Some(17.0));
    assert_eq!(report.fd.limit, Some(2176.0));
    assert_eq!(report.responsiveness.responsive(), Some(true));
}
