// tests/supervisor_fake.rs
mod common;
use crate::common::{init_tracing, spawn_serve, wait_for_state, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use localplugin::errors::PluginError;
use localplugin::plugin::{DEFAULT_TIMEOUT, Plugin, PluginState};

use common::fake_executor::{ExecutorCall, FakeExecutor};
use common::sink::{Level, RecordingSink};

type TestResult = Result<(), Box<dyn Error>>;

fn supervised(machine: &str, executor: FakeExecutor) -> (Arc<Plugin<FakeExecutor>>, RecordingSink) {
    let sink = RecordingSink::new();
    let plugin = Plugin::new(machine, executor).with_sink(Arc::new(sink.clone()));
    (Arc::new(plugin), sink)
}

#[tokio::test]
async fn handshake_line_becomes_the_trimmed_address() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor);
    let server = spawn_serve(&plugin);

    child.say("   127.0.0.1:51234 \t").await;
    let address = with_timeout(plugin.address()).await?;
    assert_eq!(address, "127.0.0.1:51234");

    with_timeout(plugin.close()).await;
    with_timeout(server).await??;
    assert_eq!(plugin.state(), PluginState::Closed);
    assert_eq!(child.calls(), vec![ExecutorCall::Start, ExecutorCall::Close]);
    Ok(())
}

#[tokio::test]
async fn address_times_out_before_handshake_and_can_be_retried() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let sink = RecordingSink::new();
    let plugin = Arc::new(
        Plugin::new("m1", executor)
            .with_sink(Arc::new(sink))
            .with_timeout(Duration::from_millis(30)),
    );
    let server = spawn_serve(&plugin);

    match plugin.address().await {
        Err(PluginError::AddressDiscoveryTimeout { timeout }) => {
            assert_eq!(timeout, Duration::from_millis(30));
        }
        other => panic!("expected AddressDiscoveryTimeout, got {other:?}"),
    }
    assert!(!server.is_finished(), "a discovery timeout must not stop serve");

    child.say("10.1.2.3:2376").await;
    let address = with_timeout(async {
        loop {
            match plugin.address().await {
                Ok(address) => break address,
                Err(PluginError::AddressDiscoveryTimeout { .. }) => continue,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    })
    .await;
    assert_eq!(address, "10.1.2.3:2376");

    with_timeout(plugin.close()).await;
    with_timeout(server).await??;
    Ok(())
}

#[tokio::test]
async fn second_address_call_returns_the_cached_value_without_waiting() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor);
    let server = spawn_serve(&plugin);

    child.say("localhost:9000").await;
    assert_eq!(with_timeout(plugin.address()).await?, "localhost:9000");

    // Ready on first poll: a zero timeout still succeeds.
    let again = tokio::time::timeout(Duration::ZERO, plugin.address()).await?;
    assert_eq!(again?, "localhost:9000");
    assert_eq!(plugin.cached_address().as_deref(), Some("localhost:9000"));

    with_timeout(plugin.close()).await;
    with_timeout(server).await??;
    Ok(())
}

#[tokio::test]
async fn stdout_lines_are_relayed_as_info_in_order() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, sink) = supervised("machine-a", executor);
    let server = spawn_serve(&plugin);

    child.say("127.0.0.1:1").await;
    let expected: Vec<String> = (0..20).map(|i| format!("creating machine step {i}")).collect();
    for line in expected.iter() {
        child.say(line).await;
    }

    with_timeout(sink.wait_for_len(expected.len())).await;
    assert_eq!(sink.infos(), expected);
    assert!(sink.records().iter().all(|r| r.level == Level::Info));
    assert!(sink.records().iter().all(|r| r.machine == "machine-a"));
    // The handshake line itself is never logged.
    assert!(!sink.infos().contains(&"127.0.0.1:1".to_string()));

    with_timeout(plugin.close()).await;
    with_timeout(server).await??;
    Ok(())
}

#[tokio::test]
async fn stderr_lines_are_relayed_as_debug_without_loss() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, sink) = supervised("machine-b", executor);
    let server = spawn_serve(&plugin);

    child.say("127.0.0.1:2").await;
    let mut out_expected = Vec::new();
    let mut err_expected = Vec::new();
    for i in 0..100 {
        let out = format!("out {i}");
        let err = format!("err {i}");
        child.say(&out).await;
        child.complain(&err).await;
        out_expected.push(out);
        err_expected.push(err);
    }

    with_timeout(sink.wait_for_len(200)).await;
    assert_eq!(sink.infos(), out_expected);
    assert_eq!(sink.debugs(), err_expected);
    assert!(sink.records().iter().all(|r| r.machine == "machine-b"));

    with_timeout(plugin.close()).await;
    with_timeout(server).await??;
    assert_eq!(sink.records().len(), 200, "no line may be duplicated");
    Ok(())
}

#[tokio::test]
async fn serve_keeps_waiting_for_stop_after_output_ends() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, sink) = supervised("m1", executor);
    let server = spawn_serve(&plugin);

    child.say("127.0.0.1:3").await;
    child.say("bye").await;
    let calls = child.call_log();
    child.exit();

    with_timeout(sink.wait_for_len(1)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!server.is_finished());
    assert_eq!(plugin.state(), PluginState::Serving);

    with_timeout(plugin.close()).await;
    with_timeout(server).await??;
    assert_eq!(
        *calls.lock().unwrap(),
        vec![ExecutorCall::Start, ExecutorCall::Close]
    );
    Ok(())
}

#[tokio::test]
async fn close_is_idempotent_and_waits_for_serve() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor);
    let server = spawn_serve(&plugin);

    child.say("127.0.0.1:4").await;
    with_timeout(plugin.address()).await?;

    with_timeout(plugin.close()).await;
    assert_eq!(plugin.state(), PluginState::Closed);
    // A second close must not block.
    with_timeout(plugin.close()).await;

    with_timeout(server).await??;
    Ok(())
}

#[tokio::test]
async fn wait_failure_becomes_the_serve_error() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor.failing_close());
    let server = spawn_serve(&plugin);

    child.say("127.0.0.1:5").await;
    with_timeout(plugin.address()).await?;
    with_timeout(plugin.close()).await;

    match with_timeout(server).await? {
        Err(PluginError::ProcessWait { driver, .. }) => assert_eq!(driver, "fake"),
        other => panic!("expected ProcessWait, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn start_failure_is_returned_and_no_address_is_published() -> TestResult {
    init_tracing();
    let (executor, child) = FakeExecutor::new("fake");
    let sink = RecordingSink::new();
    let plugin = Plugin::new("m1", executor.failing_start())
        .with_sink(Arc::new(sink))
        .with_timeout(Duration::from_millis(20));

    match plugin.serve().await {
        Err(PluginError::ProcessStart { driver, .. }) => assert_eq!(driver, "fake"),
        other => panic!("expected ProcessStart, got {other:?}"),
    }
    assert_eq!(plugin.state(), PluginState::Closed);
    assert!(matches!(
        plugin.address().await,
        Err(PluginError::AddressDiscoveryTimeout { .. })
    ));
    assert_eq!(child.calls(), vec![ExecutorCall::Start]);
    Ok(())
}

#[tokio::test]
async fn missing_handshake_fails_and_terminates_the_child() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor);
    let server = spawn_serve(&plugin);

    child.close_stdout();

    match with_timeout(server).await? {
        Err(PluginError::AddressHandshake { driver, reason }) => {
            assert_eq!(driver, "fake");
            assert!(reason.contains("before printing its address"), "{reason}");
        }
        other => panic!("expected AddressHandshake, got {other:?}"),
    }
    assert_eq!(plugin.state(), PluginState::Closed);
    assert_eq!(child.calls(), vec![ExecutorCall::Start, ExecutorCall::Terminate]);
    assert!(plugin.cached_address().is_none());
    Ok(())
}

#[tokio::test]
async fn blank_handshake_line_is_rejected() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor);
    let server = spawn_serve(&plugin);

    child.say("   ").await;

    assert!(matches!(
        with_timeout(server).await?,
        Err(PluginError::AddressHandshake { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn stop_during_handshake_terminates_the_child() -> TestResult {
    init_tracing();
    let (executor, child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor);
    let server = spawn_serve(&plugin);

    with_timeout(wait_for_state(&plugin, PluginState::HandshakePending)).await;
    with_timeout(plugin.close()).await;

    with_timeout(server).await??;
    assert_eq!(child.calls(), vec![ExecutorCall::Start, ExecutorCall::Terminate]);
    Ok(())
}

#[tokio::test]
async fn serve_twice_is_rejected() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor);
    let server = spawn_serve(&plugin);

    child.say("127.0.0.1:6").await;
    with_timeout(plugin.address()).await?;

    assert!(matches!(plugin.serve().await, Err(PluginError::AlreadyStarted)));

    with_timeout(plugin.close()).await;
    with_timeout(server).await??;
    assert_eq!(child.calls(), vec![ExecutorCall::Start, ExecutorCall::Close]);
    Ok(())
}

#[tokio::test]
async fn close_before_serve_prevents_the_start() -> TestResult {
    init_tracing();
    let (executor, child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor);

    with_timeout(plugin.close()).await;
    assert_eq!(plugin.state(), PluginState::Closed);
    assert!(matches!(plugin.serve().await, Err(PluginError::AlreadyStarted)));
    assert!(child.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn stop_requested_before_serve_returns_without_starting() -> TestResult {
    init_tracing();
    let (executor, child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor);

    plugin.request_stop();
    with_timeout(plugin.serve()).await?;
    assert_eq!(plugin.state(), PluginState::Closed);
    assert!(child.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn abandoned_serve_leaves_the_plugin_closed() -> TestResult {
    init_tracing();
    let (executor, child) = FakeExecutor::new("fake");
    let (plugin, _sink) = supervised("m1", executor);

    // The fake never prints an address, so serve is still in its handshake.
    let abandoned = tokio::time::timeout(Duration::from_millis(50), plugin.serve()).await;
    assert!(abandoned.is_err());

    assert_eq!(plugin.state(), PluginState::Closed);
    with_timeout(plugin.close()).await;
    assert_eq!(child.calls(), vec![ExecutorCall::Start]);
    Ok(())
}

#[tokio::test]
async fn relayed_lines_keep_their_indentation() -> TestResult {
    init_tracing();
    let (executor, mut child) = FakeExecutor::new("fake");
    let (plugin, sink) = supervised("m1", executor);
    let server = spawn_serve(&plugin);

    child.say("  127.0.0.1:7  ").await;
    child.say("    indented detail").await;
    child.complain("\ttabbed ").await;

    with_timeout(sink.wait_for_len(2)).await;
    assert_eq!(with_timeout(plugin.address()).await?, "127.0.0.1:7");
    assert_eq!(sink.infos(), vec!["    indented detail"]);
    assert_eq!(sink.debugs(), vec!["\ttabbed "]);

    with_timeout(plugin.close()).await;
    with_timeout(server).await??;
    Ok(())
}

#[test]
fn zero_timeout_means_default() {
    let (executor, _child) = FakeExecutor::new("fake");
    let plugin = Plugin::new("m1", executor).with_timeout(Duration::ZERO);
    assert_eq!(plugin.timeout(), DEFAULT_TIMEOUT);
    assert_eq!(plugin.driver_name(), "fake");
    assert_eq!(plugin.machine_name(), "m1");
    assert_eq!(plugin.state(), PluginState::NotStarted);
}
