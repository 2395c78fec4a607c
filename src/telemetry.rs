//! Telemetry utilities for request timing and span construction.

use std::time::Instant;

/// Guard for timing request handling and recording metrics.
///
/// Records request latency when dropped.
pub struct RequestTimer {
    component: &'static str,
    service: String,
    start: Instant,
}

impl RequestTimer {
    /// Start timing a request.
    pub fn new(component: &'static str, service: impl Into<String>) -> Self {
        Self {
            component,
            service: service.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_request(self.component, &self.service, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span covering everything a node does.
    pub fn node(name: &str) -> Span {
        info_span!("node", name = %name)
    }

    /// Span for the membership registry.
    pub fn registry() -> Span {
        info_span!("registry")
    }

    /// Span for one inbound request.
    pub fn request(service: &str, clock: u64) -> Span {
        info_span!("request", service = %service, clock = clock)
    }

    /// Span for one gateway connection.
    pub fn connection(id: &str, peer: &str) -> Span {
        info_span!("connection", id = %id, peer = %peer)
    }
}
