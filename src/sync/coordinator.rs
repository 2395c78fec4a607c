//! Coordinator tracking.
//!
//! Election announcements are produced elsewhere; nodes only record the most
//! recent one. The last announcement applied wins, even when its clock is
//! older than the one already recorded; such announcements are logged as
//! possibly stale.

use crate::state::Node;
use meshchat_proto::ElectionAnnouncement;
use parking_lot::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Current {
    coordinator: String,
    clock: u64,
}

/// Holds the coordinator id last announced.
#[derive(Debug, Default)]
pub struct CoordinatorTracker {
    current: Mutex<Option<Current>>,
}

/// What applying an announcement did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorUpdate {
    /// First announcement, or a different coordinator than before.
    Changed,
    /// Same coordinator announced again.
    Unchanged,
    /// Applied, but its clock is older than the previous announcement's.
    Stale,
}

impl CoordinatorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current coordinator id, if any announcement was seen.
    pub fn current(&self) -> Option<String> {
        self.current.lock().as_ref().map(|c| c.coordinator.clone())
    }

    /// Record an announcement.
    pub fn apply(&self, announcement: &ElectionAnnouncement) -> CoordinatorUpdate {
        let mut current = self.current.lock();
        let previous = current.replace(Current {
            coordinator: announcement.coordinator.clone(),
            clock: announcement.clock,
        });

        match previous {
            Some(prev) if announcement.clock < prev.clock => CoordinatorUpdate::Stale,
            Some(prev) if prev.coordinator == announcement.coordinator => {
                CoordinatorUpdate::Unchanged
            }
            _ => CoordinatorUpdate::Changed,
        }
    }
}

impl Node {
    /// Handle an election announcement: observe its clock, then record it.
    pub fn apply_election(&self, announcement: ElectionAnnouncement) -> CoordinatorUpdate {
        let observed = self.clock.observe(announcement.clock);
        let update = self.coordinator.apply(&announcement);

        match update {
            CoordinatorUpdate::Changed => {
                info!(
                    node = %self.name,
                    coordinator = %announcement.coordinator,
                    clock = observed,
                    "Coordinator updated"
                );
                crate::metrics::record_coordinator_change();
            }
            CoordinatorUpdate::Unchanged => {}
            CoordinatorUpdate::Stale => {
                warn!(
                    node = %self.name,
                    coordinator = %announcement.coordinator,
                    announced_clock = announcement.clock,
                    "Applied election announcement older than the previous one, possibly stale"
                );
                crate::metrics::record_coordinator_change();
            }
        }
        update
    }
}
