//! meshchatd - distributed chat daemon.
//!
//! Hosts application-server nodes and, optionally, the membership registry
//! in one process. Nodes answer client requests, gossip their user and
//! channel sets to each other, and keep themselves listed at the registry
//! with heartbeats.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod network;
pub mod registry;
pub mod runtime;
pub mod state;
pub mod sync;
pub mod telemetry;
