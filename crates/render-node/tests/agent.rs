use std::net::Ipv4Addr;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use rf_render_node::{router, AgentState};

async fn call(app: &axum::Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn metrics_document_shape() {
    let app = router(AgentState::new(Ipv4Addr::new(10, 6, 0, 31)));
    let (status, body) = call(&app, Method::GET, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["renderNodeIp"], "10.6.0.31");
    assert_eq!(body["isRunning"], false);
    let cpu = body["cpuUsage"].as_f64().unwrap();
    assert!((10.0..90.0).contains(&cpu));
    let gpu = body["gpuUsage"].as_f64().unwrap();
    assert!((5.0..70.0).contains(&gpu));
    assert!(body["memoryUtilization"].is_number());
}

#[tokio::test]
async fn start_stop_cycle() {
    let state = AgentState::new(Ipv4Addr::new(10, 6, 0, 31));
    let app = router(state.clone());

    let (status, body) = call(&app, Method::POST, "/stop").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Render Node is not running.");

    let (status, body) = call(&app, Method::POST, "/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Render Node started successfully.");
    assert!(state.is_running());

    let (status, body) = call(&app, Method::POST, "/start").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Render Node is already running.");

    let (_, body) = call(&app, Method::GET, "/metrics").await;
    assert_eq!(body["isRunning"], true);

    let (status, body) = call(&app, Method::POST, "/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Render Node stopped successfully.");
    assert!(!state.is_running());
}
