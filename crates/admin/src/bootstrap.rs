//! AppState construction and background-task startup, shared by `serve`
//! and the API tests.

use std::sync::Arc;

use anyhow::Context;

use rf_domain::config::{Config, ConfigSeverity};
use rf_registry::{CandidateSource, NodeRegistry};

use crate::directory::RenderDirectory;
use crate::events::SnapshotBridge;
use crate::probe::HttpProbe;
use crate::render_client::RenderClient;
use crate::state::AppState;

const EVENT_BUFFER: usize = 64;

/// Validate config and wire the registry to the HTTP probe.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    build_app_state_with_source(config, None)
}

/// Like [`build_app_state`], but discovery scans read from `source`
/// instead of the HTTP probe when one is given.
pub fn build_app_state_with_source(
    config: Arc<Config>,
    source: Option<Arc<dyn CandidateSource>>,
) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }

    // ── Render node client & probe ──────────────────────────────────
    let render = RenderClient::new(config.discovery.probe_timeout())
        .context("building render node HTTP client")?;
    let directory = Arc::new(RenderDirectory::new());
    let probe = Arc::new(HttpProbe::new(
        render.clone(),
        directory.clone(),
        &config.discovery,
        config.vpc.render_port,
    ));
    tracing::info!(
        static_candidates = config.discovery.candidates.len(),
        render_port = config.vpc.render_port,
        "discovery probe ready"
    );

    // ── Registry ─────────────────────────────────────────────────────
    let source = source.unwrap_or_else(|| probe.clone() as Arc<dyn CandidateSource>);
    let registry = NodeRegistry::builder()
        .registry_config(config.registry.clone())
        .vpc_config(config.vpc.clone())
        .source(source)
        .build()
        .context("building node registry")?;

    let events = Arc::new(SnapshotBridge::attach(&registry, EVENT_BUFFER));

    Ok(AppState {
        config,
        registry,
        directory,
        render,
        probe,
        events,
    })
}

/// Start the registry's periodic discovery and heartbeat tasks.
pub fn spawn_background_tasks(state: &AppState) -> anyhow::Result<()> {
    state
        .registry
        .start()
        .context("starting node detection")?;
    Ok(())
}
