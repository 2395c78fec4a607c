//! State management module.
//!
//! Contains the per-node state and the lifecycle manager shared by every
//! task the daemon spawns.

pub mod managers;
mod node;

pub use managers::lifecycle::LifecycleManager;
pub use node::{LoginRecord, Node, NodeState};
