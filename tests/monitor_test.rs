#![allow(clippy::unwrap_used)]
// End-to-end tests of `Monitor`: a fake process controller plus a wiremock
// node API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ipfs_daemon_monitor::daemon::{DaemonCommand, DaemonControl, DaemonSupervisor, LaunchOutcome};
use ipfs_daemon_monitor::persistence::SettingsStore;
use ipfs_daemon_monitor::{Config, DaemonPhase, Monitor, MonitorError, StatusView};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeDaemon {
    running: AtomicBool,
    fail_launch: bool,
    launches: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl FakeDaemon {
    fn running() -> Arc<Self> {
        let daemon = Self::default();
        daemon.running.store(true, Ordering::SeqCst);
        Arc::new(daemon)
    }

    fn stopped() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn broken() -> Arc<Self> {
        Arc::new(Self {
            fail_launch: true,
            ..Self::default()
        })
    }

    /// Process died behind the supervisor's back.
    fn crash(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl DaemonControl for FakeDaemon {
    async fn launch(&self) -> Result<LaunchOutcome, MonitorError> {
        if self.fail_launch {
            return Err(MonitorError::ProcessSpawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "ipfs: no such file or directory",
            )));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(LaunchOutcome::AlreadyRunning);
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(LaunchOutcome::Spawned { pid: Some(4242) })
    }

    async fn shutdown(&self) -> Result<(), MonitorError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

struct Harness {
    server: MockServer,
    monitor: Monitor,
    _dir: TempDir,
    settings_path: std::path::PathBuf,
}

async fn harness(daemon: Arc<FakeDaemon>) -> Harness {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("settings.json");
    harness_with(server, daemon, dir, settings_path).await
}

async fn harness_with(
    server: MockServer,
    daemon: Arc<FakeDaemon>,
    dir: TempDir,
    settings_path: std::path::PathBuf,
) -> Harness {
    let config = Config {
        api_port: server.address().port(),
        manage_repository: false,
        ..Config::default()
    };
    harness_with_config(server, config, daemon, dir, settings_path).await
}

async fn harness_with_config(
    server: MockServer,
    config: Config,
    daemon: Arc<dyn DaemonControl>,
    dir: TempDir,
    settings_path: std::path::PathBuf,
) -> Harness {
    let settings = SettingsStore::open(&settings_path).await;
    let monitor = Monitor::with_parts(config, daemon, settings, None).unwrap();
    Harness {
        server,
        monitor,
        _dir: dir,
        settings_path,
    }
}

async fn mount_node(server: &MockServer) {
    let endpoints = [
        ("version", json!({"Version": "0.29.0", "Repo": "15"})),
        ("id", json!({"ID": "12D3KooWNode"})),
        (
            "swarm/peers",
            json!({"Peers": [{"Peer": "a"}, {"Peer": "b"}, {"Peer": "c"}]}),
        ),
        (
            "stats/bw",
            json!({"TotalIn": 1000, "TotalOut": 500, "RateIn": 0.0, "RateOut": 0.0}),
        ),
        ("repo/stat", json!({"RepoSize": 1_500_000, "NumObjects": 12})),
    ];
    for (api_path, body) in endpoints {
        Mock::given(method("POST"))
            .and(path(format!("/api/v0/{api_path}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }
}

async fn wait_for_view<F>(monitor: &Monitor, predicate: F) -> StatusView
where
    F: Fn(&StatusView) -> bool,
{
    let mut rx = monitor.subscribe();
    let view = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|view| predicate(view)))
        .await
        .expect("status did not reach the expected state")
        .unwrap()
        .clone();
    view
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_online_tick_publishes_snapshot() {
    let h = harness(FakeDaemon::running()).await;
    mount_node(&h.server).await;

    let _consumer = h.monitor.register_consumer();
    let view = wait_for_view(&h.monitor, |view| view.online()).await;

    assert_eq!(view.phase, DaemonPhase::Online);
    assert_eq!(view.snapshot.version, "0.29.0");
    assert_eq!(view.snapshot.peer_count, 3);
    assert_eq!(view.snapshot.peer_id.as_deref(), Some("12D3KooWNode"));
    assert_eq!(view.snapshot.repo_size_bytes, Some(1_500_000));
    assert_eq!(view.bandwidth.len(), 1);
    assert_eq!(view.bandwidth.latest().map(|s| s.rate_in), Some(0));
    assert_eq!(view.gateway_url(), "http://127.0.0.1:18181");
}

#[tokio::test]
async fn test_unexpected_exit_goes_offline_on_next_tick() {
    let daemon = FakeDaemon::running();
    let h = harness(Arc::clone(&daemon)).await;
    mount_node(&h.server).await;

    let _consumer = h.monitor.register_consumer();
    wait_for_view(&h.monitor, |view| view.online()).await;

    daemon.crash();
    h.monitor.request_refresh();
    let view = wait_for_view(&h.monitor, |view| !view.online()).await;
    assert_eq!(view.phase, DaemonPhase::Offline);
    // Repo size stays known while offline.
    assert_eq!(view.snapshot.repo_size_bytes, Some(1_500_000));
}

#[tokio::test]
async fn test_no_queries_without_consumers() {
    let h = harness(FakeDaemon::running()).await;
    mount_node(&h.server).await;

    h.monitor.request_refresh();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests.is_empty(), "poller queried without consumers: {requests:?}");
    assert!(!h.monitor.status().online());
}

#[tokio::test]
async fn test_polling_resumes_when_a_consumer_registers() {
    let h = harness(FakeDaemon::running()).await;
    mount_node(&h.server).await;

    let consumer = h.monitor.register_consumer();
    wait_for_view(&h.monitor, |view| view.online()).await;
    drop(consumer);
    assert_eq!(h.monitor.state().consumer_count(), 0);

    let _again = h.monitor.register_consumer();
    h.monitor.request_refresh();
    wait_for_view(&h.monitor, |view| view.online()).await;
}

#[tokio::test]
async fn test_shutdown_discards_in_flight_poll() {
    let daemon = FakeDaemon::running();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"Version": "0.29.0"}))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("settings.json");
    let h = harness_with(server, Arc::clone(&daemon), dir, settings_path).await;

    let _consumer = h.monitor.register_consumer();
    // Let the first poll start and block on the slow version call.
    tokio::time::sleep(Duration::from_millis(300)).await;

    h.monitor.shutdown_daemon().await.unwrap();
    let view = wait_for_view(&h.monitor, |view| view.phase == DaemonPhase::Offline).await;
    assert!(!view.online());

    // Past the point where the slow answer would have arrived.
    tokio::time::sleep(Duration::from_millis(2000)).await;
    let view = h.monitor.status();
    assert!(!view.online());
    assert_eq!(view.phase, DaemonPhase::Offline);
    assert!(view.bandwidth.is_empty());
}

#[tokio::test]
async fn test_hung_node_times_out_as_offline_and_polling_continues() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"Version": "0.29.0"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let config = Config {
        api_port: server.address().port(),
        manage_repository: false,
        poll_interval_secs: 1,
        query_timeout_secs: 1,
        ..Config::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("settings.json");
    let h = harness_with_config(server, config, FakeDaemon::running(), dir, settings_path).await;

    let _consumer = h.monitor.register_consumer();
    let first = wait_for_view(&h.monitor, |view| view.snapshot.captured_at.timestamp() > 0).await;
    assert!(!first.online());
    assert_eq!(first.phase, DaemonPhase::Offline);

    let first_at = first.snapshot.captured_at;
    let later = wait_for_view(&h.monitor, |view| view.snapshot.captured_at > first_at).await;
    assert!(!later.online());

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests.len() >= 2, "expected repeated polls, got {}", requests.len());
}

// ── Launch and preferences ──────────────────────────────────────────

#[tokio::test]
async fn test_enable_launches_and_saves_preference() {
    let daemon = FakeDaemon::stopped();
    let h = harness(Arc::clone(&daemon)).await;
    mount_node(&h.server).await;
    let _consumer = h.monitor.register_consumer();

    h.monitor.set_daemon_enabled(true).await.unwrap();
    assert_eq!(daemon.launches.load(Ordering::SeqCst), 1);
    assert_eq!(h.monitor.settings().load_daemon_preference().await, Some(true));
    wait_for_view(&h.monitor, |view| view.phase == DaemonPhase::Online).await;

    h.monitor.set_daemon_enabled(false).await.unwrap();
    assert!(!daemon.is_running());
    let reopened = SettingsStore::open(&h.settings_path).await;
    assert_eq!(reopened.load_daemon_preference().await, Some(false));
    wait_for_view(&h.monitor, |view| view.phase == DaemonPhase::Offline).await;
}

#[tokio::test]
async fn test_failed_launch_keeps_preference_and_reports_reason() {
    let h = harness(FakeDaemon::broken()).await;
    h.monitor
        .settings()
        .save_daemon_preference(false)
        .await
        .unwrap();

    let result = h.monitor.set_daemon_enabled(true).await;
    assert!(
        matches!(result, Err(MonitorError::ProcessSpawn(_))),
        "expected ProcessSpawn, got: {result:?}"
    );
    assert_eq!(h.monitor.settings().load_daemon_preference().await, Some(false));

    let view = wait_for_view(&h.monitor, |view| {
        view.not_running_reason.is_some() && view.phase == DaemonPhase::Offline
    })
    .await;
    assert!(!view.online());
    assert!(view
        .not_running_reason
        .as_deref()
        .is_some_and(|reason| reason.contains("spawn")));
}

#[cfg(unix)]
#[tokio::test]
async fn test_daemon_exiting_during_startup_fails_the_toggle() {
    let server = MockServer::start().await;
    let config = Config {
        api_port: server.address().port(),
        manage_repository: false,
        launch_timeout_secs: 20,
        ..Config::default()
    };
    let command = DaemonCommand {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "exit 1".to_string()],
        env: Vec::new(),
        ready_marker: "Daemon is ready".to_string(),
    };
    let supervisor = Arc::new(DaemonSupervisor::new(command, Duration::from_secs(2)));
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("settings.json");
    let h = harness_with_config(server, config, supervisor, dir, settings_path).await;

    let result = tokio::time::timeout(Duration::from_secs(5), h.monitor.set_daemon_enabled(true))
        .await
        .expect("launch waited for the full launch timeout");
    assert!(
        matches!(result, Err(MonitorError::NotReady(_))),
        "expected NotReady, got: {result:?}"
    );
    assert_eq!(h.monitor.settings().load_daemon_preference().await, None);

    let view = wait_for_view(&h.monitor, |view| {
        view.phase == DaemonPhase::Offline && view.not_running_reason.is_some()
    })
    .await;
    assert!(!view.online());
}

#[tokio::test]
async fn test_launch_goes_online_without_consumers() {
    let daemon = FakeDaemon::stopped();
    let h = harness(Arc::clone(&daemon)).await;
    mount_node(&h.server).await;

    h.monitor.launch().await.unwrap();
    let view = wait_for_view(&h.monitor, |view| view.phase == DaemonPhase::Online).await;
    assert!(view.online());
    assert!(!view.is_operating());
    assert_eq!(h.monitor.state().consumer_count(), 0);
}

#[tokio::test]
async fn test_failed_preference_save_is_reported() {
    let daemon = FakeDaemon::stopped();
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    // A directory where the settings file should be cannot be replaced.
    let settings_path = dir.path().join("settings.json");
    std::fs::create_dir(&settings_path).unwrap();
    let h = harness_with(server, Arc::clone(&daemon), dir, settings_path).await;

    let result = h.monitor.set_daemon_enabled(true).await;
    assert!(
        matches!(result, Err(MonitorError::Io(_))),
        "expected Io error, got: {result:?}"
    );
    assert!(daemon.is_running());
}

#[tokio::test]
async fn test_auto_launch_respects_disabled_preference() {
    let daemon = FakeDaemon::stopped();
    let h = harness(Arc::clone(&daemon)).await;
    h.monitor
        .settings()
        .save_daemon_preference(false)
        .await
        .unwrap();

    assert_eq!(h.monitor.auto_launch().await.unwrap(), None);
    assert_eq!(daemon.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_auto_launch_without_preference_launches() {
    let daemon = FakeDaemon::stopped();
    let h = harness(Arc::clone(&daemon)).await;

    let outcome = h.monitor.auto_launch().await.unwrap();
    assert_eq!(outcome, Some(LaunchOutcome::Spawned { pid: Some(4242) }));
    assert!(daemon.is_running());
}

#[tokio::test]
async fn test_stop_shuts_down_without_touching_preference() {
    let daemon = FakeDaemon::running();
    let h = harness(Arc::clone(&daemon)).await;
    h.monitor
        .settings()
        .save_daemon_preference(true)
        .await
        .unwrap();

    h.monitor.stop().await;
    assert!(!daemon.is_running());
    assert_eq!(daemon.shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(h.monitor.status().phase, DaemonPhase::Offline);

    let reopened = SettingsStore::open(&h.settings_path).await;
    assert_eq!(reopened.load_daemon_preference().await, Some(true));
}

// ── Keys ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_keys_require_online_node() {
    let h = harness(FakeDaemon::stopped()).await;
    let result = h.monitor.list_keys().await;
    assert!(
        matches!(result, Err(MonitorError::NotReady(_))),
        "expected NotReady, got: {result:?}"
    );
}

#[tokio::test]
async fn test_list_keys_hides_self() {
    let h = harness(FakeDaemon::running()).await;
    mount_node(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/api/v0/key/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Keys": [
            {"Name": "self", "Id": "k51self"},
            {"Name": "blog", "Id": "k51blog"}
        ]})))
        .mount(&h.server)
        .await;

    let _consumer = h.monitor.register_consumer();
    wait_for_view(&h.monitor, |view| view.online()).await;

    let keys = h.monitor.list_keys().await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].name, "blog");
    assert!(h.monitor.key_exists("blog").await.unwrap());
    assert!(!h.monitor.key_exists("self").await.unwrap());
}

#[tokio::test]
async fn test_keys_work_without_consumers() {
    let h = harness(FakeDaemon::running()).await;
    mount_node(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/api/v0/key/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Keys": [
            {"Name": "self", "Id": "k51self"},
            {"Name": "notes", "Id": "k51notes"}
        ]})))
        .mount(&h.server)
        .await;

    assert!(!h.monitor.status().online());
    let keys = h.monitor.list_keys().await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].name, "notes");
}

#[tokio::test]
async fn test_keys_fail_when_node_does_not_answer() {
    let h = harness(FakeDaemon::running()).await;
    let result = h.monitor.list_keys().await;
    assert!(
        matches!(result, Err(MonitorError::NotReady(_))),
        "expected NotReady, got: {result:?}"
    );
}

#[tokio::test]
async fn test_self_key_cannot_be_removed() {
    let h = harness(FakeDaemon::running()).await;
    let result = h.monitor.remove_key("self").await;
    assert!(matches!(result, Err(MonitorError::Ipfs(_))), "got: {result:?}");
}
