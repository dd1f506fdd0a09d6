//! VPC status and runtime reconfiguration.

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use rf_domain::address::parse_private_ipv4;
use rf_domain::config::RegistryConfig;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/vpc
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.vpc_status())
}

/// Partial update; omitted fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct VpcUpdate {
    pub admin_address: Option<String>,
    pub cidr: Option<String>,
    pub vpc_id: Option<String>,
    pub render_port: Option<u16>,
    pub registry: Option<RegistryConfig>,
}

/// PUT /api/vpc: swap parameters and restart the periodic tasks.
pub async fn reconfigure(
    State(state): State<AppState>,
    Json(update): Json<VpcUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let mut vpc = state.registry.vpc_config();
    if let Some(raw) = update.admin_address.as_deref() {
        vpc.admin_address = parse_private_ipv4(raw)?;
    }
    if let Some(cidr) = update.cidr {
        vpc.cidr = cidr;
    }
    if let Some(vpc_id) = update.vpc_id {
        vpc.vpc_id = vpc_id;
    }
    if let Some(port) = update.render_port {
        vpc.render_port = port;
    }
    let registry = update
        .registry
        .unwrap_or_else(|| state.registry.registry_config());

    let render_port = vpc.render_port;
    state
        .registry
        .reconfigure(vpc, registry)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    state.probe.set_render_port(render_port);

    tracing::info!(render_port, "VPC configuration updated");
    Ok(Json(state.registry.vpc_status()))
}
