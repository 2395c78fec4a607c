//! Asynchronous events carried by the publish/subscribe fabric.
//!
//! The same `{service, data}` envelope as requests. The topic an event is
//! published on is chosen by the sender: a channel name for `publish`, the
//! destination username for `message`, or one of the reserved topics below.

use serde::{Deserialize, Serialize};

/// Topic carrying replication snapshots.
pub const REPLICATION_TOPIC: &str = "replication";

/// Topic carrying server-level announcements, elections included.
pub const SERVERS_TOPIC: &str = "servers";

/// Topic reserved for election announcements.
pub const ELECTION_TOPIC: &str = "election";

/// Topics every application server listens on.
pub const RESERVED_TOPICS: &[&str] = &[REPLICATION_TOPIC, SERVERS_TOPIC, ELECTION_TOPIC];

/// An event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", content = "data", rename_all = "lowercase")]
pub enum Event {
    Publish(Publication),
    Message(DirectMessage),
    Replication(ReplicationSnapshot),
    Election(ElectionAnnouncement),
}

/// A post to a channel. Also the persisted publication record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub user: String,
    pub channel: String,
    pub message: String,
    pub timestamp: f64,
    #[serde(default)]
    pub clock: u64,
}

/// A point-to-point message. Also the persisted message record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub src: String,
    pub dst: String,
    pub message: String,
    pub timestamp: f64,
    #[serde(default)]
    pub clock: u64,
}

/// A node's full user and channel listing, gossiped for convergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationSnapshot {
    /// Name of the node that produced the snapshot.
    #[serde(rename = "server")]
    pub origin: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub clock: u64,
}

/// Announcement of the node currently acting as coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionAnnouncement {
    pub coordinator: String,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub clock: u64,
}

impl Event {
    /// The event kind as it appears on the wire.
    pub fn service(&self) -> &'static str {
        match self {
            Self::Publish(_) => "publish",
            Self::Message(_) => "message",
            Self::Replication(_) => "replication",
            Self::Election(_) => "election",
        }
    }

    /// The sender's clock embedded in the event.
    pub fn clock(&self) -> u64 {
        match self {
            Self::Publish(e) => e.clock,
            Self::Message(e) => e.clock,
            Self::Replication(e) => e.clock,
            Self::Election(e) => e.clock,
        }
    }
}
