//! Integration test common infrastructure.
//!
//! Provides an in-process cluster (embedded registry plus nodes, each behind
//! a TCP gateway on an ephemeral port) and a framed test client.

pub mod client;
pub mod cluster;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use cluster::{TestCluster, wait_until};
