//! Inter-component plumbing: request loops, the event bus, the registry
//! client, and the background tasks that keep nodes in step.

pub mod client;
pub mod coordinator;
pub mod fabric;
pub mod heartbeat;
pub mod replication;
pub mod service;

pub use client::{RegistryClient, TcpRegistryClient};
pub use coordinator::{CoordinatorTracker, CoordinatorUpdate};
pub use fabric::{EventBus, LocalBus, Subscription};
pub use heartbeat::{HeartbeatOutcome, RegisterError};
pub use replication::MergeOutcome;
pub use service::{Service, ServiceHandle, spawn_request_loop};
