//! meshchatd - distributed chat daemon.

use meshchatd::config::Config;
use meshchatd::state::LifecycleManager;
use meshchatd::sync::fabric::{EventBus, LocalBus};
use meshchatd::{http, metrics, runtime};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// How long tasks get to stop after shutdown is signalled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing. MESHCHAT_LOG_FORMAT=json switches to JSON lines.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("MESHCHAT_LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "meshchat.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        nodes = config.nodes.len(),
        registry = ?config.registry.mode(),
        "Starting meshchatd"
    );

    let lifecycle = LifecycleManager::new();

    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    if config.metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        info!("Metrics initialized");

        let port = config.metrics_port;
        lifecycle.track(
            "metrics-http",
            tokio::spawn(http::run_http_server(port, lifecycle.subscribe())),
        );
        info!(port, "Prometheus HTTP server started");
    }

    let bus: Arc<dyn EventBus> = Arc::new(LocalBus::default());
    let cluster = runtime::start(&config, bus, &lifecycle).await?;
    info!(
        nodes = cluster.nodes.len(),
        tasks = lifecycle.task_count(),
        "meshchatd running"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }

    lifecycle.shutdown();
    lifecycle.join(SHUTDOWN_GRACE).await;
    info!("meshchatd stopped");
    Ok(())
}
