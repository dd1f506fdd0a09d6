//! Pass-through endpoints between the dashboard and render node agents.

use std::net::Ipv4Addr;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use rf_domain::address::parse_private_ipv4;

use crate::error::ApiError;
use crate::render_client::RenderCommand;
use crate::state::AppState;

const INVALID_IP: &str = "Invalid or missing Render Node private IP address.";

#[derive(Debug, Deserialize)]
pub struct IpBody {
    #[serde(default)]
    pub ip: Option<String>,
}

fn require_ip(raw: Option<&str>) -> Result<Ipv4Addr, ApiError> {
    raw.and_then(|ip| parse_private_ipv4(ip).ok())
        .ok_or_else(|| ApiError::bad_request(INVALID_IP))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/register
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<IpBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ip = require_ip(body.ip.as_deref())?;
    state.directory.add(ip);
    state.registry.record_heartbeat_by_address(ip);
    Ok(Json(json!({ "message": "Render Node registered successfully." })))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/nodes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_nodes(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "nodes": state.directory.list() }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/monitor?ip=
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct MonitorQuery {
    pub ip: Option<String>,
}

/// Relay the node's metrics document, or `{status: "unreachable"}` when
/// the node does not answer. A successful fetch counts as contact.
pub async fn monitor(
    State(state): State<AppState>,
    Query(query): Query<MonitorQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ip = require_ip(query.ip.as_deref())?;
    let path = state.config.discovery.metrics_path.as_str();

    match state.render.fetch_metrics(ip, state.render_port(), path).await {
        Ok(metrics) => {
            state.registry.record_heartbeat_by_address(ip);
            Ok(Json(metrics))
        }
        Err(e) => {
            tracing::warn!(address = %ip, error = %e, "metrics fetch failed");
            Ok(Json(json!({
                "status": "unreachable",
                "error": format!("Failed to fetch metrics from Render Node at {ip}."),
            })))
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/start, POST /api/stop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn start(state: State<AppState>, body: Json<IpBody>) -> Result<Response, ApiError> {
    forward(state, body, RenderCommand::Start).await
}

pub async fn stop(state: State<AppState>, body: Json<IpBody>) -> Result<Response, ApiError> {
    forward(state, body, RenderCommand::Stop).await
}

async fn forward(
    State(state): State<AppState>,
    Json(body): Json<IpBody>,
    cmd: RenderCommand,
) -> Result<Response, ApiError> {
    let ip = require_ip(body.ip.as_deref())?;
    match state.render.send_command(ip, state.render_port(), cmd).await {
        Ok(()) => {
            tracing::info!(address = %ip, command = %cmd, "render node command forwarded");
            Ok(Json(json!({
                "message": format!("Render Node at {ip} {} successfully.", cmd.past_tense()),
            }))
            .into_response())
        }
        Err(e) => {
            tracing::warn!(address = %ip, command = %cmd, error = %e, "render node command failed");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Failed to {cmd} Render Node at {ip}.") })),
            )
                .into_response())
        }
    }
}
