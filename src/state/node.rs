//! Application-server node state.
//!
//! A [`Node`] owns everything one application server knows: its users and
//! channels, the append-only logs, its Lamport clock and the coordinator it
//! last heard about. All mutable state sits behind one mutex; handlers get a
//! [`Context`] borrowing it for the duration of a single request.
//!
//! Lock order is state, then clock.

use crate::db::{self, Collection, Store};
use crate::handlers::{self, Context};
use crate::sync::coordinator::CoordinatorTracker;
use crate::sync::fabric::EventBus;
use crate::sync::service::Service;
use meshchat_proto::{
    DirectMessage, OrderedSet, Publication, Request, Response, ServerEntry, SharedClock,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// A successful login, kept for auditing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub user: String,
    pub timestamp: f64,
}

/// Everything a node mutates while handling requests and merging snapshots.
#[derive(Debug, Default)]
pub struct NodeState {
    pub users: OrderedSet<String>,
    pub channels: OrderedSet<String>,
    pub logins: Vec<LoginRecord>,
    pub messages: Vec<DirectMessage>,
    pub publications: Vec<Publication>,
    /// Requests handled since the last clock-resync hook.
    pub requests_since_resync: u32,
}

impl NodeState {
    /// Rebuild state from the store. Missing or unreadable collections start empty.
    pub fn load(store: &dyn Store) -> Self {
        let state = Self {
            users: db::load(store, Collection::Users),
            channels: db::load(store, Collection::Channels),
            logins: db::load(store, Collection::Logins),
            messages: db::load(store, Collection::Messages),
            publications: db::load(store, Collection::Publications),
            requests_since_resync: 0,
        };
        info!(
            users = state.users.len(),
            channels = state.channels.len(),
            logins = state.logins.len(),
            messages = state.messages.len(),
            publications = state.publications.len(),
            "Loaded node state"
        );
        state
    }
}

/// One application server.
pub struct Node {
    pub(crate) name: String,
    pub(crate) clock: SharedClock,
    pub(crate) state: Mutex<NodeState>,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) bus: Arc<dyn EventBus>,
    pub(crate) coordinator: CoordinatorTracker,
    rank: Mutex<Option<u64>>,
    peers: Mutex<Vec<ServerEntry>>,
    resync_every: u32,
}

impl Node {
    /// Create a node, loading its persisted collections.
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        resync_every: u32,
    ) -> Self {
        let state = NodeState::load(store.as_ref());
        Self {
            name: name.into(),
            clock: SharedClock::new(),
            state: Mutex::new(state),
            store,
            bus,
            coordinator: CoordinatorTracker::new(),
            rank: Mutex::new(None),
            peers: Mutex::new(Vec::new()),
            resync_every: resync_every.max(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn coordinator(&self) -> &CoordinatorTracker {
        &self.coordinator
    }

    /// Rank assigned by the registry, once registered.
    pub fn rank(&self) -> Option<u64> {
        *self.rank.lock()
    }

    pub fn set_rank(&self, rank: u64) {
        let previous = self.rank.lock().replace(rank);
        if previous.is_some_and(|p| p != rank) {
            info!(node = %self.name, previous = ?previous, rank, "Rank changed after re-registration");
        }
    }

    pub fn clear_rank(&self) {
        *self.rank.lock() = None;
    }

    /// Active servers as last reported by the registry.
    pub fn peers(&self) -> Vec<ServerEntry> {
        self.peers.lock().clone()
    }

    pub fn set_peers(&self, peers: Vec<ServerEntry>) {
        *self.peers.lock() = peers;
    }

    pub fn users(&self) -> Vec<String> {
        self.state.lock().users.to_vec()
    }

    pub fn channels(&self) -> Vec<String> {
        self.state.lock().channels.to_vec()
    }

    pub fn logins(&self) -> Vec<LoginRecord> {
        self.state.lock().logins.clone()
    }

    pub fn messages(&self) -> Vec<DirectMessage> {
        self.state.lock().messages.clone()
    }

    pub fn publications(&self) -> Vec<Publication> {
        self.state.lock().publications.clone()
    }

    pub fn requests_since_resync(&self) -> u32 {
        self.state.lock().requests_since_resync
    }

    /// Count a handled request and fire the resync hook when due.
    fn count_request(&self, state: &mut NodeState) {
        state.requests_since_resync = state.requests_since_resync.saturating_add(1);
        if state.requests_since_resync < self.resync_every {
            return;
        }
        if let Some(coordinator) = self.coordinator.current() {
            state.requests_since_resync = 0;
            self.resync_hook(&coordinator);
        }
    }

    /// Clock-resync hook. Only logs and counts: no resync protocol exists.
    fn resync_hook(&self, coordinator: &str) {
        info!(
            node = %self.name,
            coordinator = %coordinator,
            clock = self.clock.value(),
            "Resync with coordinator"
        );
        crate::metrics::record_resync();
    }
}

impl Service for Node {
    fn component(&self) -> &'static str {
        "node"
    }

    fn handle(&self, request: Request) -> Response {
        let mut state = self.state.lock();
        let observed = self.clock.observe(request.clock());
        debug!(node = %self.name, service = request.service(), clock = observed, "Handling request");

        let response = {
            let mut ctx = Context {
                node: &self.name,
                state: &mut state,
                clock: &self.clock,
                store: self.store.as_ref(),
                bus: self.bus.as_ref(),
            };
            handlers::dispatch(&mut ctx, request)
        };

        self.count_request(&mut state);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::sync::fabric::LocalBus;
    use meshchat_proto::ElectionAnnouncement;

    fn node(resync_every: u32) -> Node {
        Node::new(
            "alpha",
            Arc::new(MemoryStore::new()),
            Arc::new(LocalBus::default()),
            resync_every,
        )
    }

    #[test]
    fn test_state_is_rebuilt_from_store() {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(LocalBus::default());
        {
            let first = Node::new("alpha", store.clone(), bus.clone(), 10);
            first.handle(Request::login("alice", 0));
            first.handle(Request::channel("general", 0));
        }

        let restarted = Node::new("alpha", store, bus, 10);
        assert_eq!(restarted.users(), vec!["alice"]);
        assert_eq!(restarted.channels(), vec!["general"]);
        assert_eq!(restarted.logins().len(), 1);
        // The clock is not persisted.
        assert_eq!(restarted.clock().value(), 0);
    }

    #[test]
    fn test_every_reply_carries_a_clock_past_the_request() {
        let node = node(10);
        let response = node.handle(Request::users(41));
        // observe(41) = 42, then the reply ticks to 43
        assert_eq!(response.clock(), 43);
    }

    #[test]
    fn test_resync_counter_without_coordinator_keeps_counting() {
        let node = node(3);
        for _ in 0..5 {
            node.handle(Request::users(0));
        }
        assert_eq!(node.requests_since_resync(), 5);
    }

    #[test]
    fn test_resync_counter_resets_once_coordinator_is_known() {
        let node = node(3);
        node.apply_election(ElectionAnnouncement {
            coordinator: "beta".into(),
            timestamp: 0.0,
            clock: 1,
        });

        node.handle(Request::users(0));
        node.handle(Request::users(0));
        assert_eq!(node.requests_since_resync(), 2);

        node.handle(Request::users(0));
        assert_eq!(node.requests_since_resync(), 0);
    }

    #[test]
    fn test_rank_tracking() {
        let node = node(10);
        assert_eq!(node.rank(), None);
        node.set_rank(2);
        assert_eq!(node.rank(), Some(2));
        node.clear_rank();
        assert_eq!(node.rank(), None);
    }
}
