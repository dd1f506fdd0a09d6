//! Node manager endpoints backed by the liveness registry.

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use futures_util::stream::Stream;
use serde::Deserialize;
use serde_json::json;

use rf_domain::node::BulkOperation;
use rf_registry::ScanOutcome;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/registry/nodes
pub async fn list(State(state): State<AppState>) -> impl IntoResponse {
    let nodes = state.registry.list();
    Json(json!({
        "nodes": nodes,
        "count": nodes.len(),
    }))
}

/// GET /api/registry/nodes/:id
pub async fn details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let node = state.registry.get_details(&id)?;
    Ok(Json(json!({ "node": node })))
}

pub async fn freeze(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry.freeze(&id)?;
    Ok(Json(json!({ "ok": true, "node": state.registry.get(&id) })))
}

pub async fn restart(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry.restart(&id)?;
    Ok(Json(json!({
        "ok": true,
        "node": state.registry.get(&id),
        "back_online_in_ms": state.registry.registry_config().restart_delay_ms,
    })))
}

pub async fn remote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let connection = state.registry.connect_remote(&id)?;
    Ok(Json(json!({
        "url": connection.to_string(),
        "connection": connection,
    })))
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub ids: Vec<String>,
    pub operation: String,
}

/// POST /api/registry/bulk
pub async fn bulk(
    State(state): State<AppState>,
    Json(req): Json<BulkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let op: BulkOperation = req.operation.parse().map_err(ApiError::BadRequest)?;
    Ok(Json(state.registry.bulk_operation(&req.ids, op)))
}

/// POST /api/registry/refresh: run one discovery scan now.
pub async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    let body = match state.registry.refresh().await {
        ScanOutcome::Completed(report) => json!({ "status": "completed", "report": report }),
        ScanOutcome::Skipped => json!({ "status": "skipped" }),
        ScanOutcome::Failed(error) => json!({ "status": "failed", "error": error }),
    };
    Json(body)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/registry/events (SSE)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Current node list first, then one `nodes` event per registry publish.
pub async fn events_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let mut rx = state.events.subscribe();
    let initial = state.registry.list();

    let stream = async_stream::stream! {
        if let Ok(json) = serde_json::to_string(&initial) {
            yield Ok(Event::default().event("nodes").data(json));
        }
        loop {
            match rx.recv().await {
                Ok(snapshot) => {
                    if let Ok(json) = serde_json::to_string(snapshot.as_slice()) {
                        yield Ok(Event::default().event("nodes").data(json));
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "SSE client lagged behind node snapshots");
                    continue;
                }
                Err(_) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
