//! Prometheus metrics collection for meshchatd.
//!
//! Exposed on the HTTP endpoint when `metrics_port` is set.
//!
//! - `meshchat_requests_total{component, service}` - Requests processed
//! - `meshchat_request_duration_seconds{component, service}` - Request latency histogram
//! - `meshchat_request_errors_total{component, service, error}` - Structured error replies
//! - `meshchat_replication_merged_total{kind}` - Names added by replication merges
//! - `meshchat_heartbeats_total{outcome}` - Heartbeat results seen by nodes
//! - `meshchat_coordinator_changes_total` - Election announcements applied
//! - `meshchat_resync_hooks_total` - Clock-resync hooks fired
//! - `meshchat_dropped_frames_total{reason}` - Frames dropped by the gateway
//! - `meshchat_events_lagged_total` - Events lost by slow bus subscribers
//! - `meshchat_store_failures_total{collection}` - Failed collection writes

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Request path
// ========================================================================

/// Requests processed, by component and service.
pub static REQUEST_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Request processing latency, by component and service.
pub static REQUEST_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Structured error replies, by component, service and error kind.
pub static REQUEST_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Frames the gateway could not decode or answer.
pub static DROPPED_FRAMES: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Coordination
// ========================================================================

/// Names added to local sets by replication merges, by kind.
pub static REPLICATION_MERGED: OnceLock<IntCounterVec> = OnceLock::new();

/// Heartbeat outcomes.
pub static HEARTBEATS: OnceLock<IntCounterVec> = OnceLock::new();

/// Election announcements applied.
pub static COORDINATOR_CHANGES: OnceLock<IntCounter> = OnceLock::new();

/// Clock-resync hooks fired.
pub static RESYNC_HOOKS: OnceLock<IntCounter> = OnceLock::new();

/// Events lost because a bus subscriber fell behind.
pub static EVENTS_LAGGED: OnceLock<IntCounter> = OnceLock::new();

/// Failed collection writes.
pub static STORE_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; only the first call registers anything.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                let m = $init.expect(concat!(stringify!($metric), " creation failed"));
                if let Err(e) = r.register(Box::new(m.clone())) {
                    tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                }
                let _ = $metric.set(m);
            }
        };
    }

    register!(REQUEST_COUNTER, IntCounterVec::new(Opts::new("meshchat_requests_total", "Requests processed"), &["component", "service"]));
    register!(REQUEST_LATENCY, HistogramVec::new(
        HistogramOpts::new("meshchat_request_duration_seconds", "Request latency")
            .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        &["component", "service"]));
    register!(REQUEST_ERRORS, IntCounterVec::new(Opts::new("meshchat_request_errors_total", "Structured error replies"), &["component", "service", "error"]));
    register!(DROPPED_FRAMES, IntCounterVec::new(Opts::new("meshchat_dropped_frames_total", "Frames dropped by the gateway"), &["reason"]));

    register!(REPLICATION_MERGED, IntCounterVec::new(Opts::new("meshchat_replication_merged_total", "Names added by replication merges"), &["kind"]));
    register!(HEARTBEATS, IntCounterVec::new(Opts::new("meshchat_heartbeats_total", "Heartbeat outcomes"), &["outcome"]));
    register!(COORDINATOR_CHANGES, IntCounter::new("meshchat_coordinator_changes_total", "Election announcements applied"));
    register!(RESYNC_HOOKS, IntCounter::new("meshchat_resync_hooks_total", "Clock-resync hooks fired"));
    register!(EVENTS_LAGGED, IntCounter::new("meshchat_events_lagged_total", "Events lost by slow bus subscribers"));
    register!(STORE_FAILURES, IntCounterVec::new(Opts::new("meshchat_store_failures_total", "Failed collection writes"), &["collection"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

/// Record a processed request with latency.
#[inline]
pub fn record_request(component: &str, service: &str, duration_secs: f64) {
    if let Some(c) = REQUEST_COUNTER.get() {
        c.with_label_values(&[component, service]).inc();
    }
    if let Some(h) = REQUEST_LATENCY.get() {
        h.with_label_values(&[component, service]).observe(duration_secs);
    }
}

/// Record a structured error reply.
#[inline]
pub fn record_request_error(component: &str, service: &str, error: &str) {
    if let Some(c) = REQUEST_ERRORS.get() {
        c.with_label_values(&[component, service, error]).inc();
    }
}

#[inline]
pub fn record_dropped_frame(reason: &str) {
    if let Some(c) = DROPPED_FRAMES.get() {
        c.with_label_values(&[reason]).inc();
    }
}

/// Record names added by a replication merge.
#[inline]
pub fn record_replication_merge(kind: &str, added: usize) {
    if added == 0 {
        return;
    }
    if let Some(c) = REPLICATION_MERGED.get() {
        c.with_label_values(&[kind]).inc_by(added as u64);
    }
}

#[inline]
pub fn record_heartbeat(outcome: &str) {
    if let Some(c) = HEARTBEATS.get() {
        c.with_label_values(&[outcome]).inc();
    }
}

#[inline]
pub fn record_coordinator_change() {
    if let Some(c) = COORDINATOR_CHANGES.get() {
        c.inc();
    }
}

#[inline]
pub fn record_resync() {
    if let Some(c) = RESYNC_HOOKS.get() {
        c.inc();
    }
}

#[inline]
pub fn record_lagged(missed: u64) {
    if let Some(c) = EVENTS_LAGGED.get() {
        c.inc_by(missed);
    }
}

#[inline]
pub fn record_store_failure(collection: &str) {
    if let Some(c) = STORE_FAILURES.get() {
        c.with_label_values(&[collection]).inc();
    }
}
