//! Lamport logical clock for ordering events across nodes.
//!
//! [`LamportClock`] is the plain value type. [`SharedClock`] is the handle a
//! node hands to every task that emits or receives messages: each operation
//! runs under one exclusive section so concurrent read-modify-write calls
//! cannot interleave.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A Lamport logical clock for establishing causal ordering of events.
///
/// The value increases monotonically. It is advanced on local events with
/// [`tick`](Self::tick) and on received messages with
/// [`observe`](Self::observe).
///
/// # Example
///
/// ```rust
/// use meshchat_proto::clock::LamportClock;
///
/// let mut clock_a = LamportClock::new();
/// let mut clock_b = LamportClock::new();
///
/// clock_a.tick();
/// clock_a.tick();
/// assert_eq!(clock_a.value(), 2);
///
/// // B receives a message stamped by A
/// clock_b.merge(&clock_a);
/// assert_eq!(clock_b.value(), 3); // max(0, 2) + 1
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LamportClock {
    value: u64,
}

impl LamportClock {
    /// Creates a new clock initialized to 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Creates a clock with a specific initial value.
    #[must_use]
    pub const fn with_value(value: u64) -> Self {
        Self { value }
    }

    /// Returns the current clock value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// Increments the clock for a local event and returns the new value.
    pub fn tick(&mut self) -> u64 {
        self.value = self.value.saturating_add(1);
        self.value
    }

    /// Applies the happened-before rule for a received clock value.
    ///
    /// Sets this clock to `max(self, received) + 1` and returns it.
    pub fn observe(&mut self, received: u64) -> u64 {
        self.value = self.value.max(received).saturating_add(1);
        self.value
    }

    /// Merges with another clock (typically from a received message).
    pub fn merge(&mut self, other: &LamportClock) -> u64 {
        self.observe(other.value)
    }

    /// Returns `true` if `self` definitely happened before `other`.
    ///
    /// Lamport clocks only give a partial order: `false` does not imply that
    /// `other` happened before `self`.
    #[must_use]
    pub const fn happened_before(&self, other: &LamportClock) -> bool {
        self.value < other.value
    }
}

/// Thread-safe handle to a process-wide [`LamportClock`].
///
/// Cloning the handle shares the underlying counter.
#[derive(Debug, Clone, Default)]
pub struct SharedClock {
    inner: Arc<Mutex<LamportClock>>,
}

impl SharedClock {
    /// Creates a shared clock starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a shared clock starting at `value`.
    #[must_use]
    pub fn with_value(value: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LamportClock::with_value(value))),
        }
    }

    /// Increments the clock for a locally originated event.
    pub fn tick(&self) -> u64 {
        self.inner.lock().tick()
    }

    /// Merges a received clock value: `max(local, received) + 1`.
    ///
    /// Call exactly once per inbound message, before producing any response
    /// or side effect for it.
    pub fn observe(&self, received: u64) -> u64 {
        self.inner.lock().observe(received)
    }

    /// Returns a snapshot of the current value without advancing it.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.inner.lock().value()
    }
}
