//! Name registry.
//!
//! Hands out sticky ranks and tracks which servers are still sending
//! heartbeats. The registry keeps everything in memory; a restarted registry
//! starts from an empty table and servers register again.

mod membership;

pub use membership::{Membership, ServerRecord};

use crate::error::{ServiceError, ServiceResult};
use crate::sync::service::Service;
use meshchat_proto::{Request, Response, SharedClock, Status};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

/// The registry as a request-handling component.
pub struct RegistryService {
    membership: Mutex<Membership>,
    clock: SharedClock,
}

impl RegistryService {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            membership: Mutex::new(Membership::new(stale_after)),
            clock: SharedClock::new(),
        }
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Active servers right now, ascending by rank.
    pub fn active(&self) -> Vec<meshchat_proto::ServerEntry> {
        self.membership.lock().list_active()
    }

    fn route(&self, membership: &mut Membership, request: Request) -> ServiceResult<Response> {
        match request {
            Request::Rank(req) => {
                let rank = membership.register(&req.user)?;
                Ok(Response::rank(rank, self.clock.tick()))
            }
            Request::Heartbeat(req) => {
                membership.heartbeat(&req.user)?;
                Ok(Response::status("heartbeat", Status::Ok, self.clock.tick()))
            }
            Request::List(_) => Ok(Response::servers(
                membership.list_active(),
                self.clock.tick(),
            )),
            _ => Err(ServiceError::UnknownService),
        }
    }
}

impl Service for RegistryService {
    fn component(&self) -> &'static str {
        "registry"
    }

    fn handle(&self, request: Request) -> Response {
        let mut membership = self.membership.lock();
        let observed = self.clock.observe(request.clock());
        let service = request.service().to_string();
        debug!(service = %service, clock = observed, "Handling registry request");

        self.route(&mut membership, request).unwrap_or_else(|e| {
            debug!(service = %service, error = %e, "Registry request rejected");
            crate::metrics::record_request_error("registry", &service, e.error_code());
            Response::error(service, e.to_string(), self.clock.tick())
        })
    }
}
