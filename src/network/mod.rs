//! Network module.
//!
//! Contains the Gateway (TCP listener) and the per-peer Connection handler.

mod connection;
mod gateway;

pub use connection::Connection;
pub use gateway::Gateway;
