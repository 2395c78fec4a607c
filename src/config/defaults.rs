//! Default value functions for configuration.

// =============================================================================
// Registry Defaults
// =============================================================================

/// Heartbeat age after which a server drops out of `list`.
pub fn default_stale_after_secs() -> u64 {
    30
}

// =============================================================================
// Timer Defaults
// =============================================================================

pub fn default_heartbeat_interval_secs() -> u64 {
    10
}

pub fn default_replication_interval_secs() -> u64 {
    30
}

/// Requests between clock-resync hooks.
pub fn default_resync_every() -> u32 {
    10
}

pub fn default_register_attempts() -> u32 {
    5
}

pub fn default_register_backoff_ms() -> u64 {
    500
}
