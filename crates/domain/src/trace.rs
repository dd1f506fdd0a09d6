use serde::Serialize;

/// Structured trace events emitted across all renderfleet crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ScanCompleted {
        candidates: usize,
        discovered: usize,
        refreshed: usize,
        unreachable: usize,
        duration_ms: u64,
    },
    NodeDiscovered {
        node_id: String,
        address: String,
        region: String,
    },
    NodeOffline {
        node_id: String,
        silent_ms: i64,
    },
    NodeEvicted {
        node_id: String,
        silent_ms: i64,
    },
    NodeOperation {
        node_id: String,
        operation: String,
        success: bool,
    },
    BulkOperationCompleted {
        operation: String,
        succeeded: usize,
        failed: usize,
    },
}

impl TraceEvent {
    /// Emit this event as a tracing span event.
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "renderfleet_event");
    }
}
