//! `/register`, `/heartbeat`, `/status` — the worker-facing ingress.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use mesh_types::{HeartbeatRequest, RegisterRequest};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

pub fn create_worker_router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/heartbeat", post(heartbeat))
        .route("/status", get(status))
        .with_state(state)
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if req.worker_id.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let worker = state.registry.register(req);
    tracing::info!(worker_id = %worker.worker_id, "worker registered");
    Ok(Json(json!({"status": "registered"})))
}

async fn heartbeat(
    State(state): State<AppState>,
    Json(req): Json<HeartbeatRequest>,
) -> Result<StatusCode, (StatusCode, Json<serde_json::Value>)> {
    match state.registry.heartbeat(&req) {
        Ok(()) => Ok(StatusCode::OK),
        Err(_unknown) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "unknown node, please re-register"})),
        )),
    }
}

#[derive(Serialize)]
struct StatusResponse {
    nodes: Vec<mesh_types::Worker>,
    node_count: usize,
    server_time: u64,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let nodes = state.registry.snapshot();
    Json(StatusResponse {
        node_count: nodes.len(),
        nodes,
        server_time: mesh_core::time::now_ms(),
    })
}
