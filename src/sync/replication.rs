//! Gossip replication of user and channel names.
//!
//! Every node periodically broadcasts its full user and channel lists on the
//! `replication` topic. Nodes receiving a snapshot from someone else merge it
//! by set union, so redelivery is harmless and the order snapshots arrive in
//! does not change the resulting membership.
//!
//! The same listener task also consumes election announcements.

use crate::db::{self, Collection};
use crate::state::Node;
use crate::sync::client::RegistryClient;
use crate::sync::fabric::EventBus;
use meshchat_proto::{
    Event, REPLICATION_TOPIC, RESERVED_TOPICS, ReplicationSnapshot, Reply, Request,
    unix_timestamp,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, debug, info, trace, warn};

/// Names a merge added to the local sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub users_added: usize,
    pub channels_added: usize,
}

impl MergeOutcome {
    pub fn is_noop(&self) -> bool {
        self.users_added == 0 && self.channels_added == 0
    }
}

impl Node {
    /// Build this node's snapshot and publish it, under the state lock.
    pub fn broadcast_snapshot(&self) -> ReplicationSnapshot {
        let state = self.state.lock();
        let snapshot = ReplicationSnapshot {
            origin: self.name.clone(),
            users: state.users.to_vec(),
            channels: state.channels.to_vec(),
            timestamp: unix_timestamp(),
            clock: self.clock.tick(),
        };
        self.bus
            .publish(REPLICATION_TOPIC, Event::Replication(snapshot.clone()));
        drop(state);

        debug!(
            node = %self.name,
            users = snapshot.users.len(),
            channels = snapshot.channels.len(),
            clock = snapshot.clock,
            "Replication snapshot sent"
        );
        snapshot
    }

    /// Merge a snapshot from another node.
    ///
    /// Returns `None` for this node's own snapshots, which are ignored
    /// without observing their clock. Only collections the merge changed are
    /// persisted.
    pub fn apply_snapshot(&self, snapshot: ReplicationSnapshot) -> Option<MergeOutcome> {
        if snapshot.origin == self.name {
            trace!(node = %self.name, "Ignoring own replication snapshot");
            return None;
        }

        let mut state = self.state.lock();
        let observed = self.clock.observe(snapshot.clock);

        let outcome = MergeOutcome {
            users_added: state.users.merge(snapshot.users),
            channels_added: state.channels.merge(snapshot.channels),
        };
        if outcome.users_added > 0 {
            db::save(self.store.as_ref(), Collection::Users, &state.users);
        }
        if outcome.channels_added > 0 {
            db::save(self.store.as_ref(), Collection::Channels, &state.channels);
        }
        drop(state);

        crate::metrics::record_replication_merge("users", outcome.users_added);
        crate::metrics::record_replication_merge("channels", outcome.channels_added);

        if outcome.is_noop() {
            trace!(node = %self.name, origin = %snapshot.origin, "Replication snapshot already known");
        } else {
            info!(
                node = %self.name,
                origin = %snapshot.origin,
                users_added = outcome.users_added,
                channels_added = outcome.channels_added,
                clock = observed,
                "Merged replication snapshot"
            );
        }
        Some(outcome)
    }

    /// React to one event from the reserved topics.
    pub fn handle_event(&self, topic: &str, event: Event) {
        match event {
            Event::Replication(snapshot) => {
                self.apply_snapshot(snapshot);
            }
            Event::Election(announcement) => {
                self.apply_election(announcement);
            }
            other => {
                trace!(node = %self.name, %topic, service = other.service(), "Ignoring event");
            }
        }
    }
}

/// Ask the registry for the active servers and remember them as peers.
pub async fn refresh_peers(node: &Node, client: &dyn RegistryClient) {
    let request = Request::list(node.clock.tick());
    let response = match client.call(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(node = %node.name, error = %e, "Failed to fetch server list");
            return;
        }
    };
    node.clock.observe(response.clock());

    match response.data {
        Reply::Servers(reply) => {
            let names: Vec<&str> = reply.list.iter().map(|s| s.name.as_str()).collect();
            debug!(node = %node.name, servers = ?names, "Active servers");
            node.set_peers(reply.list);
        }
        other => {
            warn!(node = %node.name, reply = ?other, "Unexpected reply to list");
        }
    }
}

/// Spawn the periodic replication broadcaster.
///
/// The first snapshot goes out one period after start.
pub fn spawn_broadcaster(
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
                        debug!("Replication broadcaster stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        refresh_peers(&node, client.as_ref()).await;
                        node.broadcast_snapshot();
                    }
                }
            }
        }
        .instrument(span),
    )
}

/// Spawn the listener for replication snapshots and election announcements.
///
/// Subscribes before returning so no event published afterwards is missed.
pub fn spawn_listener(
    node: Arc<Node>,
    bus: &dyn EventBus,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let mut subscription = bus.subscribe(RESERVED_TOPICS);
    let span = crate::telemetry::spans::node(node.name());
    tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        debug!("Replication listener stopping");
                        break;
                    }
                    next = subscription.recv() => {
                        let Some((topic, event)) = next else {
                            debug!("Event bus closed, replication listener exiting");
                            break;
                        };
                        node.handle_event(&topic, event);
                    }
                }
            }
        }
        .instrument(span),
    )
}
