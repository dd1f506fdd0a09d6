use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Discovery probe
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Per-candidate probe timeout.
    #[serde(default = "d_3000")]
    pub probe_timeout_ms: u64,
    /// Path probed on each render node to decide reachability.
    #[serde(default = "d_metrics_path")]
    pub metrics_path: String,
    /// Render nodes known ahead of time, probed on every scan in addition
    /// to nodes that registered themselves.
    #[serde(default)]
    pub candidates: Vec<CandidateConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 3_000,
            metrics_path: d_metrics_path(),
            candidates: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// A statically configured render node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub address: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default = "d_services")]
    pub services: Vec<String>,
}

fn d_3000() -> u64 {
    3_000
}
fn d_metrics_path() -> String {
    "/metrics".into()
}
fn d_services() -> Vec<String> {
    vec!["render-service".into(), "gpu-monitor".into()]
}
