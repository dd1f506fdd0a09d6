use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry timing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Periods and windows driving the node registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Discovery scan period.
    #[serde(default = "d_10000")]
    pub scan_interval_ms: u64,
    /// Heartbeat check period.
    #[serde(default = "d_2000")]
    pub heartbeat_interval_ms: u64,
    /// Silence after which an online node is marked offline.
    #[serde(default = "d_10000")]
    pub retention_ms: u64,
    /// Silence after which a node is removed from the registry.
    #[serde(default = "d_300000")]
    pub eviction_ms: u64,
    /// Delay between a restart command and the node coming back online.
    #[serde(default = "d_5000")]
    pub restart_delay_ms: u64,
    /// Concurrency capacity assigned to newly discovered nodes.
    #[serde(default = "d_4")]
    pub default_capacity: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 10_000,
            heartbeat_interval_ms: 2_000,
            retention_ms: 10_000,
            eviction_ms: 300_000,
            restart_delay_ms: 5_000,
            default_capacity: 4,
        }
    }
}

impl RegistryConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn retention(&self) -> chrono::Duration {
        window(self.retention_ms)
    }

    pub fn eviction(&self) -> chrono::Duration {
        window(self.eviction_ms)
    }
}

/// Longest accepted period or window: 30 days.
pub const MAX_WINDOW_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Saturates instead of wrapping for values `validate` would reject.
fn window(ms: u64) -> chrono::Duration {
    i64::try_from(ms)
        .ok()
        .and_then(chrono::Duration::try_milliseconds)
        .unwrap_or(chrono::Duration::MAX)
}

fn d_10000() -> u64 {
    10_000
}
fn d_2000() -> u64 {
    2_000
}
fn d_300000() -> u64 {
    300_000
}
fn d_5000() -> u64 {
    5_000
}
fn d_4() -> u32 {
    4
}
