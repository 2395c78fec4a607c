//! Registration and heartbeats.
//!
//! A node registers with the registry once at startup to obtain its sticky
//! rank, then keeps itself listed by sending a heartbeat every period. When
//! the registry has forgotten the node (it restarted) or the node never got a
//! rank, the next heartbeat cycle registers again instead.

use crate::error::{ClientError, ServiceError};
use crate::state::Node;
use crate::sync::client::RegistryClient;
use meshchat_proto::{Reply, Request, Status};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, debug, info, warn};

/// Registration failures.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("registry refused registration: {0}")]
    Rejected(String),

    #[error("unexpected reply to rank request: {0}")]
    UnexpectedReply(String),
}

/// Result of one heartbeat cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// Heartbeat acknowledged.
    Ok,
    /// The node had no rank and registered.
    Registered(u64),
    /// The registry had forgotten the node; it registered again.
    Reregistered(u64),
    Failed,
}

impl HeartbeatOutcome {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Registered(_) => "registered",
            Self::Reregistered(_) => "reregistered",
            Self::Failed => "failed",
        }
    }
}

/// Ask the registry for this node's rank and record it.
pub async fn register(node: &Node, client: &dyn RegistryClient) -> Result<u64, RegisterError> {
    let response = client
        .call(Request::rank(node.name(), node.clock.tick()))
        .await?;
    node.clock.observe(response.clock());

    match response.data {
        Reply::Rank(reply) => {
            node.set_rank(reply.rank);
            info!(node = %node.name, rank = reply.rank, "Registered with registry");
            Ok(reply.rank)
        }
        Reply::Status(reply) if reply.status == Status::Error => Err(RegisterError::Rejected(
            reply.description.unwrap_or_default(),
        )),
        other => Err(RegisterError::UnexpectedReply(format!("{other:?}"))),
    }
}

/// Register, retrying up to `attempts` times with `backoff` in between.
///
/// Returns `None` when every attempt failed; the heartbeat task keeps trying.
pub async fn register_with_retry(
    node: &Node,
    client: &dyn RegistryClient,
    attempts: u32,
    backoff: Duration,
) -> Option<u64> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match register(node, client).await {
            Ok(rank) => return Some(rank),
            Err(e) => {
                warn!(node = %node.name, attempt, attempts, error = %e, "Registration failed");
                if attempt < attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    warn!(node = %node.name, "Giving up on registration for now, heartbeats will retry");
    None
}

/// Run one heartbeat cycle.
pub async fn heartbeat_once(node: &Node, client: &dyn RegistryClient) -> HeartbeatOutcome {
    let outcome = if node.rank().is_none() {
        match register(node, client).await {
            Ok(rank) => HeartbeatOutcome::Registered(rank),
            Err(e) => {
                warn!(node = %node.name, error = %e, "Registration retry failed");
                HeartbeatOutcome::Failed
            }
        }
    } else {
        send_heartbeat(node, client).await
    };

    crate::metrics::record_heartbeat(outcome.label());
    outcome
}

async fn send_heartbeat(node: &Node, client: &dyn RegistryClient) -> HeartbeatOutcome {
    let request = Request::heartbeat(node.name(), node.clock.tick());
    let response = match client.call(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(node = %node.name, error = %e, "Heartbeat failed");
            return HeartbeatOutcome::Failed;
        }
    };
    node.clock.observe(response.clock());

    if response.status_code() == Some(Status::Ok) {
        debug!(node = %node.name, "Heartbeat acknowledged");
        return HeartbeatOutcome::Ok;
    }

    let not_registered = ServiceError::NotRegistered.to_string();
    if response.description() == Some(not_registered.as_str()) {
        warn!(node = %node.name, "Registry no longer knows this node, registering again");
        node.clear_rank();
        return match register(node, client).await {
            Ok(rank) => HeartbeatOutcome::Reregistered(rank),
            Err(e) => {
                warn!(node = %node.name, error = %e, "Re-registration failed");
                HeartbeatOutcome::Failed
            }
        };
    }

    warn!(node = %node.name, reply = ?response.data, "Heartbeat rejected");
    HeartbeatOutcome::Failed
}

/// Spawn the heartbeat emitter. The first heartbeat goes out one period after start.
pub fn spawn_heartbeat(
    node: Arc<Node>,
    client: Arc<dyn RegistryClient>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let span = crate::telemetry::spans::node(node.name());
    tokio::spawn(
        async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        debug!("Heartbeat emitter stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        heartbeat_once(&node, client.as_ref()).await;
                    }
                }
            }
        }
        .instrument(span),
    )
}
