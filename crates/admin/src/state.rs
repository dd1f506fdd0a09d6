use std::sync::Arc;

use rf_domain::config::Config;
use rf_registry::NodeRegistry;

use crate::directory::RenderDirectory;
use crate::events::SnapshotBridge;
use crate::probe::HttpProbe;
use crate::render_client::RenderClient;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: NodeRegistry,
    /// Addresses that registered over `POST /api/register`.
    pub directory: Arc<RenderDirectory>,
    pub render: RenderClient,
    pub probe: Arc<HttpProbe>,
    pub events: Arc<SnapshotBridge>,
}

impl AppState {
    /// Current render node port; changes with `PUT /api/vpc`.
    pub fn render_port(&self) -> u16 {
        self.probe.render_port()
    }
}
