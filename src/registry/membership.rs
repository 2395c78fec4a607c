//! Server membership table.
//!
//! A name is registered once and keeps its rank forever: ranks are handed out
//! from a counter starting at 1 and are never reused, even after the server
//! stops sending heartbeats. Whether a server is active is derived on read
//! from the age of its last heartbeat; nothing is ever evicted.

use crate::error::{ServiceError, ServiceResult};
use meshchat_proto::ServerEntry;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// One registered server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    pub name: String,
    pub rank: u64,
    pub last_heartbeat: Instant,
}

/// Name-to-rank table with liveness.
#[derive(Debug)]
pub struct Membership {
    servers: HashMap<String, ServerRecord>,
    next_rank: u64,
    stale_after: Duration,
}

impl Membership {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            servers: HashMap::new(),
            next_rank: 1,
            stale_after,
        }
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ServerRecord> {
        self.servers.get(name)
    }

    /// Register `name`, or refresh it if already known. Returns its rank.
    pub fn register(&mut self, name: &str) -> ServiceResult<u64> {
        self.register_at(name, Instant::now())
    }

    pub fn register_at(&mut self, name: &str, now: Instant) -> ServiceResult<u64> {
        if name.is_empty() {
            return Err(ServiceError::NameRequired);
        }

        if let Some(record) = self.servers.get_mut(name) {
            record.last_heartbeat = now;
            debug!(server = %name, rank = record.rank, "Known server registered again");
            return Ok(record.rank);
        }

        let rank = self.next_rank;
        self.next_rank += 1;
        self.servers.insert(
            name.to_string(),
            ServerRecord {
                name: name.to_string(),
                rank,
                last_heartbeat: now,
            },
        );
        info!(server = %name, rank, "Server registered");
        Ok(rank)
    }

    /// Refresh the heartbeat of a registered server.
    pub fn heartbeat(&mut self, name: &str) -> ServiceResult<()> {
        self.heartbeat_at(name, Instant::now())
    }

    pub fn heartbeat_at(&mut self, name: &str, now: Instant) -> ServiceResult<()> {
        if name.is_empty() {
            return Err(ServiceError::NameRequired);
        }
        let record = self
            .servers
            .get_mut(name)
            .ok_or(ServiceError::NotRegistered)?;
        record.last_heartbeat = now;
        Ok(())
    }

    /// Active servers, ascending by rank.
    pub fn list_active(&self) -> Vec<ServerEntry> {
        self.list_active_at(Instant::now())
    }

    pub fn list_active_at(&self, now: Instant) -> Vec<ServerEntry> {
        let mut active: Vec<ServerEntry> = self
            .servers
            .values()
            .filter(|record| self.is_active(record, now))
            .map(|record| ServerEntry {
                name: record.name.clone(),
                rank: record.rank,
            })
            .collect();
        active.sort_by_key(|entry| entry.rank);
        active
    }

    fn is_active(&self, record: &ServerRecord, now: Instant) -> bool {
        now.saturating_duration_since(record.last_heartbeat) < self.stale_after
    }
}
