//! Typed requests for the application-server and registry services.
//!
//! On the wire every request is `{service, data}`; each known service has its
//! own `data` struct. Missing fields decode to their defaults so handlers can
//! answer with a structured error instead of the frame being dropped.

use crate::unix_timestamp;
use serde::{Deserialize, Serialize};

/// Service names understood by the application server.
pub const NODE_SERVICES: &[&str] = &["login", "users", "channel", "channels", "publish", "message"];

/// Service names understood by the registry.
pub const REGISTRY_SERVICES: &[&str] = &["rank", "heartbeat", "list"];

/// A request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", content = "data", rename_all = "lowercase")]
pub enum Request {
    Login(LoginRequest),
    Users(Query),
    Channel(ChannelRequest),
    Channels(Query),
    Publish(PublishRequest),
    Message(MessageRequest),
    Rank(ServerRequest),
    Heartbeat(ServerRequest),
    List(Query),
    /// A service name neither side recognises. Encoded by hand in the codec.
    #[serde(skip)]
    Unknown(UnknownRequest),
}

/// `login` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub user: String,
    pub timestamp: f64,
    pub clock: u64,
}

/// `channel` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelRequest {
    pub channel: String,
    pub timestamp: f64,
    pub clock: u64,
}

/// `publish` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishRequest {
    pub user: String,
    pub channel: String,
    pub message: String,
    pub timestamp: f64,
    pub clock: u64,
}

/// `message` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageRequest {
    pub src: String,
    pub dst: String,
    pub message: String,
    pub timestamp: f64,
    pub clock: u64,
}

/// `rank` and `heartbeat` data. The server name travels in `user`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerRequest {
    pub user: String,
    pub timestamp: f64,
    pub clock: u64,
}

/// Data for requests that carry nothing but the clock (`users`, `channels`, `list`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub timestamp: f64,
    pub clock: u64,
}

/// A request whose service name is not recognised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnknownRequest {
    pub service: String,
    pub timestamp: f64,
    pub clock: u64,
}

impl Request {
    /// The service name as it appears on the wire.
    pub fn service(&self) -> &str {
        match self {
            Self::Login(_) => "login",
            Self::Users(_) => "users",
            Self::Channel(_) => "channel",
            Self::Channels(_) => "channels",
            Self::Publish(_) => "publish",
            Self::Message(_) => "message",
            Self::Rank(_) => "rank",
            Self::Heartbeat(_) => "heartbeat",
            Self::List(_) => "list",
            Self::Unknown(u) => &u.service,
        }
    }

    /// The sender's clock embedded in the request.
    pub fn clock(&self) -> u64 {
        match self {
            Self::Login(r) => r.clock,
            Self::Users(r) | Self::Channels(r) | Self::List(r) => r.clock,
            Self::Channel(r) => r.clock,
            Self::Publish(r) => r.clock,
            Self::Message(r) => r.clock,
            Self::Rank(r) | Self::Heartbeat(r) => r.clock,
            Self::Unknown(r) => r.clock,
        }
    }

    pub fn login(user: impl Into<String>, clock: u64) -> Self {
        Self::Login(LoginRequest {
            user: user.into(),
            timestamp: unix_timestamp(),
            clock,
        })
    }

    pub fn users(clock: u64) -> Self {
        Self::Users(Query::now(clock))
    }

    pub fn channel(channel: impl Into<String>, clock: u64) -> Self {
        Self::Channel(ChannelRequest {
            channel: channel.into(),
            timestamp: unix_timestamp(),
            clock,
        })
    }

    pub fn channels(clock: u64) -> Self {
        Self::Channels(Query::now(clock))
    }

    pub fn publish(
        user: impl Into<String>,
        channel: impl Into<String>,
        message: impl Into<String>,
        clock: u64,
    ) -> Self {
        Self::Publish(PublishRequest {
            user: user.into(),
            channel: channel.into(),
            message: message.into(),
            timestamp: unix_timestamp(),
            clock,
        })
    }

    pub fn message(
        src: impl Into<String>,
        dst: impl Into<String>,
        message: impl Into<String>,
        clock: u64,
    ) -> Self {
        Self::Message(MessageRequest {
            src: src.into(),
            dst: dst.into(),
            message: message.into(),
            timestamp: unix_timestamp(),
            clock,
        })
    }

    pub fn rank(server: impl Into<String>, clock: u64) -> Self {
        Self::Rank(ServerRequest::now(server, clock))
    }

    pub fn heartbeat(server: impl Into<String>, clock: u64) -> Self {
        Self::Heartbeat(ServerRequest::now(server, clock))
    }

    pub fn list(clock: u64) -> Self {
        Self::List(Query::now(clock))
    }

    pub fn unknown(service: impl Into<String>, clock: u64) -> Self {
        Self::Unknown(UnknownRequest {
            service: service.into(),
            timestamp: unix_timestamp(),
            clock,
        })
    }
}

impl Query {
    fn now(clock: u64) -> Self {
        Self {
            timestamp: unix_timestamp(),
            clock,
        }
    }
}

impl ServerRequest {
    fn now(server: impl Into<String>, clock: u64) -> Self {
        Self {
            user: server.into(),
            timestamp: unix_timestamp(),
            clock,
        }
    }
}

/// Returns `true` if `service` is a service name some component answers.
pub fn is_known_service(service: &str) -> bool {
    NODE_SERVICES.contains(&service) || REGISTRY_SERVICES.contains(&service)
}
