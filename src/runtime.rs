//! Process wiring.
//!
//! Starts the registry (embedded or remote) and every configured node, each
//! with its request loop, optional TCP gateway and background tasks. Every
//! task is tracked by the [`LifecycleManager`] so shutdown stops them all.

use crate::config::{Config, NodeConfig, RegistryMode, TimersConfig};
use crate::db::{MemoryStore, RedbStore, Store};
use crate::network::Gateway;
use crate::registry::RegistryService;
use crate::state::{LifecycleManager, Node};
use crate::sync::client::{RegistryClient, TcpRegistryClient};
use crate::sync::fabric::EventBus;
use crate::sync::service::{ServiceHandle, spawn_request_loop};
use crate::sync::{heartbeat, replication};
use crate::telemetry::spans;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A running registry.
pub struct RunningRegistry {
    pub service: Arc<RegistryService>,
    pub handle: ServiceHandle,
    /// Bound gateway address, when listening.
    pub addr: Option<SocketAddr>,
}

/// A running node.
pub struct RunningNode {
    pub node: Arc<Node>,
    pub handle: ServiceHandle,
    pub addr: Option<SocketAddr>,
}

/// Everything [`start`] brought up.
pub struct Cluster {
    pub registry: Option<RunningRegistry>,
    pub nodes: Vec<RunningNode>,
}

impl Cluster {
    pub fn node(&self, name: &str) -> Option<&RunningNode> {
        self.nodes.iter().find(|n| n.node.name() == name)
    }
}

/// Start the registry's request loop and, with `listen`, its gateway.
pub async fn spawn_registry(
    stale_after: Duration,
    listen: Option<SocketAddr>,
    lifecycle: &LifecycleManager,
) -> anyhow::Result<RunningRegistry> {
    let service = Arc::new(RegistryService::new(stale_after));
    let (handle, task) =
        spawn_request_loop(Arc::clone(&service), lifecycle.subscribe(), spans::registry());
    lifecycle.track("registry", task);

    let addr = match listen {
        Some(listen) => {
            let gateway = Gateway::bind(listen, handle.clone(), "registry").await?;
            let addr = gateway.local_addr()?;
            lifecycle.track(
                "registry-gateway",
                tokio::spawn(gateway.run(lifecycle.subscribe())),
            );
            Some(addr)
        }
        None => None,
    };

    info!(address = ?addr, stale_after_secs = stale_after.as_secs(), "Registry started");
    Ok(RunningRegistry {
        service,
        handle,
        addr,
    })
}

fn open_store(config: &NodeConfig) -> anyhow::Result<Arc<dyn Store>> {
    match &config.database {
        Some(path) => {
            info!(node = %config.name, path = %path, "Opening node database");
            Ok(Arc::new(RedbStore::open(path)?))
        }
        None => {
            info!(node = %config.name, "No database configured, state is kept in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Start one node: restore its state, register it, then start its background
/// tasks, its request loop and its gateway.
pub async fn spawn_node(
    config: &NodeConfig,
    timers: &TimersConfig,
    bus: Arc<dyn EventBus>,
    registry: Arc<dyn RegistryClient>,
    lifecycle: &LifecycleManager,
) -> anyhow::Result<RunningNode> {
    let store = open_store(config)?;
    let node = Arc::new(Node::new(
        config.name.clone(),
        store,
        Arc::clone(&bus),
        timers.resync_every,
    ));
    let name = &config.name;

    heartbeat::register_with_retry(
        &node,
        registry.as_ref(),
        timers.register_attempts,
        timers.register_backoff(),
    )
    .await;

    lifecycle.track(
        format!("{name}-heartbeat"),
        heartbeat::spawn_heartbeat(
            Arc::clone(&node),
            Arc::clone(&registry),
            timers.heartbeat_interval(),
            lifecycle.subscribe(),
        ),
    );
    lifecycle.track(
        format!("{name}-replication"),
        replication::spawn_broadcaster(
            Arc::clone(&node),
            registry,
            timers.replication_interval(),
            lifecycle.subscribe(),
        ),
    );
    lifecycle.track(
        format!("{name}-listener"),
        replication::spawn_listener(Arc::clone(&node), bus.as_ref(), lifecycle.subscribe()),
    );

    let (handle, task) =
        spawn_request_loop(Arc::clone(&node), lifecycle.subscribe(), spans::node(name));
    lifecycle.track(format!("{name}-requests"), task);

    let addr = match config.listen {
        Some(listen) => {
            let gateway = Gateway::bind(listen, handle.clone(), name.clone()).await?;
            let addr = gateway.local_addr()?;
            lifecycle.track(
                format!("{name}-gateway"),
                tokio::spawn(gateway.run(lifecycle.subscribe())),
            );
            Some(addr)
        }
        None => None,
    };

    info!(node = %name, address = ?addr, rank = ?node.rank(), "Node started");
    Ok(RunningNode { node, handle, addr })
}

/// Bring up everything `config` describes on `bus`.
pub async fn start(
    config: &Config,
    bus: Arc<dyn EventBus>,
    lifecycle: &LifecycleManager,
) -> anyhow::Result<Cluster> {
    let (registry, client): (Option<RunningRegistry>, Arc<dyn RegistryClient>) =
        match config.registry.mode() {
            Some(RegistryMode::Embedded(listen)) => {
                let running =
                    spawn_registry(config.registry.stale_after(), Some(listen), lifecycle).await?;
                let client: Arc<dyn RegistryClient> = Arc::new(running.handle.clone());
                (Some(running), client)
            }
            Some(RegistryMode::Remote(address)) => {
                info!(%address, "Using remote registry");
                let client: Arc<dyn RegistryClient> = Arc::new(TcpRegistryClient::new(address));
                (None, client)
            }
            None => anyhow::bail!("registry must be configured with exactly one of listen or address"),
        };

    let mut nodes = Vec::with_capacity(config.nodes.len());
    for node_config in &config.nodes {
        let running = spawn_node(
            node_config,
            &config.timers,
            Arc::clone(&bus),
            Arc::clone(&client),
            lifecycle,
        )
        .await?;
        nodes.push(running);
    }

    Ok(Cluster { registry, nodes })
}
