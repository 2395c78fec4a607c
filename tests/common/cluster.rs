//! In-process test cluster.
//!
//! Starts the daemon's runtime exactly as `main` does, from a TOML config,
//! with every listener on an ephemeral loopback port and every node database
//! in a temporary directory.

use super::TestClient;
use meshchatd::config::Config;
use meshchatd::runtime::{self, Cluster};
use meshchatd::state::{LifecycleManager, Node};
use meshchatd::sync::fabric::LocalBus;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Replication interval long enough that tests drive snapshots themselves.
pub const MANUAL_REPLICATION_SECS: u64 = 3600;

/// A running cluster.
pub struct TestCluster {
    pub lifecycle: LifecycleManager,
    pub cluster: Cluster,
    pub bus: Arc<LocalBus>,
    _dir: Option<TempDir>,
}

impl TestCluster {
    /// Embedded registry plus one node per name, with manual replication.
    pub async fn start(names: &[&str]) -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let mut cluster =
            Self::start_in(dir.path(), names, MANUAL_REPLICATION_SECS).await?;
        cluster._dir = Some(dir);
        Ok(cluster)
    }

    /// Start with node databases under `dir`, which the caller keeps alive.
    pub async fn start_in(
        dir: &Path,
        names: &[&str],
        replication_secs: u64,
    ) -> anyhow::Result<Self> {
        let mut toml = format!(
            r#"
metrics_port = 0

[registry]
listen = "127.0.0.1:0"

[timers]
heartbeat_interval_secs = 1
replication_interval_secs = {replication_secs}
register_attempts = 1
"#
        );
        for name in names {
            let db = dir.join(format!("{name}.redb"));
            toml.push_str(&format!(
                r#"
[[node]]
name = "{name}"
listen = "127.0.0.1:0"
database = "{}"
"#,
                db.display()
            ));
        }
        Self::from_toml(&toml).await
    }

    /// Start whatever `toml` describes.
    pub async fn from_toml(toml: &str) -> anyhow::Result<Self> {
        let config = Config::from_toml(toml)?;
        let lifecycle = LifecycleManager::new();
        let bus = Arc::new(LocalBus::default());
        let cluster = runtime::start(&config, bus.clone(), &lifecycle).await?;
        Ok(Self {
            lifecycle,
            cluster,
            bus,
            _dir: None,
        })
    }

    pub fn node(&self, name: &str) -> &Arc<Node> {
        &self
            .cluster
            .node(name)
            .unwrap_or_else(|| panic!("no node named {name}"))
            .node
    }

    pub fn addr(&self, name: &str) -> SocketAddr {
        self.cluster
            .node(name)
            .and_then(|n| n.addr)
            .unwrap_or_else(|| panic!("node {name} has no listener"))
    }

    pub fn registry_addr(&self) -> SocketAddr {
        self.cluster
            .registry
            .as_ref()
            .and_then(|r| r.addr)
            .expect("cluster has no listening registry")
    }

    /// Connect a test client to a node.
    pub async fn client(&self, name: &str) -> anyhow::Result<TestClient> {
        TestClient::connect(self.addr(name)).await
    }

    /// Have every node send one replication snapshot.
    pub fn broadcast_all(&self) {
        for running in &self.cluster.nodes {
            running.node.broadcast_snapshot();
        }
    }

    /// Stop every task and wait for them.
    pub async fn shutdown(self) {
        self.lifecycle.shutdown();
        self.lifecycle.join(Duration::from_secs(5)).await;
    }
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
