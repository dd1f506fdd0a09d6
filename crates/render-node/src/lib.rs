//! Render node agent: reports synthetic load over `GET /metrics`, accepts
//! `POST /start` and `POST /stop`, and announces itself to the admin node.

pub mod host;

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use rand::Rng;
use serde::Serialize;
use serde_json::json;

use rf_domain::error::{Error, Result};

/// State shared by the agent's handlers.
#[derive(Debug)]
pub struct AgentState {
    address: Ipv4Addr,
    running: AtomicBool,
}

impl AgentState {
    pub fn new(address: Ipv4Addr) -> Arc<Self> {
        Arc::new(Self {
            address,
            running: AtomicBool::new(false),
        })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flip the running flag to `to`. Returns `false` if it already was.
    fn transition(&self, to: bool) -> bool {
        self.running
            .compare_exchange(!to, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Body of `GET /metrics`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub render_node_ip: Ipv4Addr,
    pub cpu_usage: f64,
    pub gpu_usage: f64,
    pub memory_utilization: f64,
    pub is_running: bool,
}

impl Metrics {
    /// CPU load is drawn from [10, 90) and GPU load from [5, 70).
    pub fn sample(state: &AgentState, rng: &mut impl Rng) -> Self {
        Self {
            render_node_ip: state.address,
            cpu_usage: rng.gen_range(10.0..90.0),
            gpu_usage: rng.gen_range(5.0..70.0),
            memory_utilization: host::memory_utilization(),
            is_running: state.is_running(),
        }
    }
}

pub fn router(state: Arc<AgentState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .with_state(state)
}

async fn metrics(State(state): State<Arc<AgentState>>) -> Json<Metrics> {
    Json(Metrics::sample(&state, &mut rand::thread_rng()))
}

async fn start(State(state): State<Arc<AgentState>>) -> Response {
    if !state.transition(true) {
        return rejected("Render Node is already running.");
    }
    tracing::info!("render process started");
    Json(json!({ "message": "Render Node started successfully." })).into_response()
}

async fn stop(State(state): State<Arc<AgentState>>) -> Response {
    if !state.transition(false) {
        return rejected("Render Node is not running.");
    }
    tracing::info!("render process stopped");
    Json(json!({ "message": "Render Node stopped successfully." })).into_response()
}

fn rejected(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// `POST http://admin:port/api/register {ip}`. Returns the admin's message.
pub async fn register_with_admin(
    admin: Ipv4Addr,
    admin_port: u16,
    address: Ipv4Addr,
    timeout: Duration,
) -> Result<String> {
    let url = format!("http://{admin}:{admin_port}/api/register");
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Http(e.to_string()))?;

    let resp = client
        .post(&url)
        .json(&json!({ "ip": address.to_string() }))
        .send()
        .await
        .map_err(|e| Error::Unreachable {
            address: admin.to_string(),
            reason: e.to_string(),
        })?;

    let status = resp.status();
    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    let text = |key: &str| body.get(key).and_then(|v| v.as_str()).map(str::to_owned);

    if status.is_success() {
        Ok(text("message").unwrap_or_default())
    } else {
        Err(Error::Http(
            text("error").unwrap_or_else(|| format!("admin node answered {status}")),
        ))
    }
}
