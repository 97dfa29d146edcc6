use ipfs_daemon_monitor::ipfs_client::{format_byte_count, format_rate};
use ipfs_daemon_monitor::{Config, DaemonPhase, Monitor, MonitorError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), MonitorError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::load().await;
    let monitor = Monitor::start(config).await?;

    let mut status = monitor.subscribe();
    let reporter = tokio::spawn(async move {
        let mut last: Option<(DaemonPhase, bool, u32)> = None;
        while status.changed().await.is_ok() {
            let view = status.borrow_and_update().clone();
            let key = (view.phase, view.online(), view.snapshot.peer_count);
            if last == Some(key) {
                continue;
            }
            last = Some(key);

            let latest = view.bandwidth.latest().copied();
            info!(
                phase = ?view.phase,
                online = view.online(),
                peers = view.snapshot.peer_count,
                version = %view.snapshot.version,
                repo_size = %view.snapshot.repo_size_bytes.map(format_byte_count).unwrap_or_default(),
                rate_in = %latest.map(|s| format_rate(s.rate_in)).unwrap_or_default(),
                rate_out = %latest.map(|s| format_rate(s.rate_out)).unwrap_or_default(),
                gateway = %view.gateway_url(),
                "IPFS status"
            );
        }
    });

    if let Err(err) = monitor.prepare_repository().await {
        error!(error = ?err, "Repository setup failed, the daemon may not start");
    }

    // The headless binary is the only status consumer.
    let _consumer = monitor.register_consumer();
    if let Err(err) = monitor.auto_launch().await {
        warn!(error = ?err, "IPFS daemon failed to launch");
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = ?err, "Failed to listen for Ctrl-C");
    }
    info!("Shutting down");
    monitor.stop().await;
    reporter.abort();
    Ok(())
}
