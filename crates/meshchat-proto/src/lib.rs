//! # meshchat-proto
//!
//! Shared vocabulary of the meshchat cluster: the envelopes exchanged between
//! clients, application servers and the registry, the MessagePack codec that
//! carries them, and the two coordination primitives every component embeds.
//!
//! ## Features
//!
//! - Typed request, response and event envelopes (`{service, data}` on the wire)
//! - MessagePack encoding with named fields, length-delimited framing
//! - Lamport logical clocks, plain and shared
//! - An insertion-ordered grow-only set for replicated names
//!
//! ## Quick Start
//!
//! ```rust
//! use meshchat_proto::{Request, SharedClock, Wire};
//!
//! let clock = SharedClock::new();
//! let bytes = Request::login("alice", clock.tick()).encode().unwrap();
//!
//! let decoded = Request::decode(&bytes).unwrap();
//! assert_eq!(decoded.service(), "login");
//! assert_eq!(clock.observe(decoded.clock()), 2);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod clock;
pub mod codec;
pub mod error;
#[allow(missing_docs)]
pub mod event;
pub mod gset;
#[allow(missing_docs)]
pub mod request;
#[allow(missing_docs)]
pub mod response;

pub use self::clock::{LamportClock, SharedClock};
pub use self::codec::{frame_codec, Wire, MAX_FRAME_LEN};
pub use self::error::{ProtocolError, Result};
pub use self::event::{
    DirectMessage, ElectionAnnouncement, Event, Publication, ReplicationSnapshot,
    ELECTION_TOPIC, REPLICATION_TOPIC, RESERVED_TOPICS, SERVERS_TOPIC,
};
pub use self::gset::OrderedSet;
pub use self::request::{
    ChannelRequest, LoginRequest, MessageRequest, PublishRequest, Query, Request, ServerRequest,
    UnknownRequest,
};
pub use self::response::{Reply, Response, ServerEntry, Status, StatusReply};

/// Wall-clock seconds since the Unix epoch, with millisecond precision.
///
/// Only ever informational: ordering decisions use the Lamport clock.
pub fn unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
