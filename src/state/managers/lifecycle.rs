//! Lifecycle management state and behavior.
//!
//! The `LifecycleManager` owns the shutdown signal and the handles of every
//! long-running task, so the daemon can stop them together.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Lifecycle management state.
///
/// The LifecycleManager handles:
/// - Shutdown signaling to request loops and background tasks
/// - Waiting for those tasks to finish
pub struct LifecycleManager {
    /// Shutdown signal broadcaster. Every task selects on a receiver.
    pub shutdown_tx: broadcast::Sender<()>,

    tasks: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleManager {
    /// Create a new LifecycleManager.
    pub fn new() -> Self {
        // Capacity 16 provides buffer for multiple slow subscribers during shutdown
        let (shutdown_tx, _) = broadcast::channel(16);

        Self {
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// A fresh receiver for the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Keep track of a task so [`join`](Self::join) waits for it.
    pub fn track(&self, name: impl Into<String>, handle: JoinHandle<()>) {
        self.tasks.lock().push((name.into(), handle));
    }

    /// Number of tracked tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Signal every task to stop.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        // Err only means no task is listening any more.
        let _ = self.shutdown_tx.send(());
    }

    /// Wait for every tracked task, aborting any still running after `grace`.
    pub async fn join(&self, grace: Duration) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for (name, mut handle) in tasks {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => warn!(task = %name, error = %e, "Task ended abnormally"),
                Err(_) => {
                    warn!(task = %name, "Task did not stop in time, aborting");
                    handle.abort();
                }
            }
        }
        info!("All tasks stopped");
    }
}
