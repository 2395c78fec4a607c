//! Typed responses.
//!
//! A response mirrors the request shape: `{service, data}`. The `data` map is
//! one of a handful of reply kinds, told apart on decode by the field they
//! carry (`users`, `channels`, `rank`, `list`, or `status`).

use crate::unix_timestamp;
use serde::{Deserialize, Serialize};

/// Outcome spelled the way each service has always spelled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Used by `login` and `channel`.
    #[serde(rename = "success")]
    Success,
    /// Used by `publish`, `message` and `heartbeat`.
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "error")]
    Error,
}

/// A response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub service: String,
    pub data: Reply,
}

/// The `data` part of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Users(UsersReply),
    Channels(ChannelsReply),
    Rank(RankReply),
    Servers(ServerListReply),
    Status(StatusReply),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsersReply {
    pub users: Vec<String>,
    #[serde(default)]
    pub timestamp: f64,
    pub clock: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelsReply {
    pub channels: Vec<String>,
    #[serde(default)]
    pub timestamp: f64,
    pub clock: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankReply {
    pub rank: u64,
    #[serde(default)]
    pub timestamp: f64,
    pub clock: u64,
}

/// One active server as reported by the registry's `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub name: String,
    pub rank: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerListReply {
    pub list: Vec<ServerEntry>,
    #[serde(default)]
    pub timestamp: f64,
    pub clock: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub timestamp: f64,
    pub clock: u64,
}

impl Response {
    fn new(service: impl Into<String>, data: Reply) -> Self {
        Self {
            service: service.into(),
            data,
        }
    }

    /// A bare status reply (`success` or `OK`).
    pub fn status(service: impl Into<String>, status: Status, clock: u64) -> Self {
        Self::new(
            service,
            Reply::Status(StatusReply {
                status,
                description: None,
                timestamp: unix_timestamp(),
                clock,
            }),
        )
    }

    /// A structured error reply carrying a human-readable description.
    pub fn error(service: impl Into<String>, description: impl Into<String>, clock: u64) -> Self {
        Self::new(
            service,
            Reply::Status(StatusReply {
                status: Status::Error,
                description: Some(description.into()),
                timestamp: unix_timestamp(),
                clock,
            }),
        )
    }

    pub fn users(users: Vec<String>, clock: u64) -> Self {
        Self::new(
            "users",
            Reply::Users(UsersReply {
                users,
                timestamp: unix_timestamp(),
                clock,
            }),
        )
    }

    pub fn channels(channels: Vec<String>, clock: u64) -> Self {
        Self::new(
            "channels",
            Reply::Channels(ChannelsReply {
                channels,
                timestamp: unix_timestamp(),
                clock,
            }),
        )
    }

    pub fn rank(rank: u64, clock: u64) -> Self {
        Self::new(
            "rank",
            Reply::Rank(RankReply {
                rank,
                timestamp: unix_timestamp(),
                clock,
            }),
        )
    }

    pub fn servers(list: Vec<ServerEntry>, clock: u64) -> Self {
        Self::new(
            "list",
            Reply::Servers(ServerListReply {
                list,
                timestamp: unix_timestamp(),
                clock,
            }),
        )
    }

    /// The responder's clock embedded in the reply.
    pub fn clock(&self) -> u64 {
        match &self.data {
            Reply::Users(r) => r.clock,
            Reply::Channels(r) => r.clock,
            Reply::Rank(r) => r.clock,
            Reply::Servers(r) => r.clock,
            Reply::Status(r) => r.clock,
        }
    }

    /// The status field, if this is a status reply.
    pub fn status_code(&self) -> Option<Status> {
        match &self.data {
            Reply::Status(r) => Some(r.status),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status_code() == Some(Status::Error)
    }

    /// The error description, if this is an error reply.
    pub fn description(&self) -> Option<&str> {
        match &self.data {
            Reply::Status(r) => r.description.as_deref(),
            _ => None,
        }
    }
}
