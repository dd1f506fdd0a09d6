pub mod cors;
pub mod health;
pub mod registry;
pub mod render;
pub mod vpc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// `/api/*` keeps the request shapes render node agents and the
/// dashboard already speak; `/api/registry/*` is the node manager API.
pub fn router() -> Router<AppState> {
    let render = Router::new()
        .route("/api/register", post(render::register))
        .route("/api/nodes", get(render::list_nodes))
        .route("/api/monitor", get(render::monitor))
        .route("/api/start", post(render::start))
        .route("/api/stop", post(render::stop));

    let registry = Router::new()
        .route("/api/registry/nodes", get(registry::list))
        .route("/api/registry/nodes/:id", get(registry::details))
        .route("/api/registry/nodes/:id/freeze", post(registry::freeze))
        .route("/api/registry/nodes/:id/restart", post(registry::restart))
        .route("/api/registry/nodes/:id/remote", post(registry::remote))
        .route("/api/registry/bulk", post(registry::bulk))
        .route("/api/registry/refresh", post(registry::refresh))
        .route("/api/registry/events", get(registry::events_sse))
        .route("/api/vpc", get(vpc::status).put(vpc::reconfigure));

    Router::new()
        .route("/v1/health", get(health::health))
        .merge(render)
        .merge(registry)
}
