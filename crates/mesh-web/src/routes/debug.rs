//! `GET /debug/routing` — a dry-run of tiered selection per task type,
//! without dispatching anything, for operators to sanity-check routing.

use std::collections::{BTreeMap, HashSet};

use axum::{extract::State, routing::get, Json, Router};
use mesh_types::TaskType;
use serde::Serialize;

use crate::state::AppState;

const ROUTABLE_TYPES: &[TaskType] = &[
    TaskType::Text,
    TaskType::Code,
    TaskType::Vision,
    TaskType::Summarize,
    TaskType::Embed,
];

pub fn create_debug_router(state: AppState) -> Router {
    Router::new().route("/debug/routing", get(routing)).with_state(state)
}

#[derive(Serialize)]
struct RoutingResponse {
    routing: BTreeMap<String, String>,
    nodes: Vec<mesh_types::Worker>,
}

async fn routing(State(state): State<AppState>) -> Json<RoutingResponse> {
    let exclude = HashSet::new();
    let mut routing = BTreeMap::new();

    for task_type in ROUTABLE_TYPES {
        let description = match state.registry.find_best(*task_type, None, &exclude) {
            Some(worker) => {
                let model = worker
                    .capabilities
                    .iter()
                    .find(|c| c.types.contains(task_type))
                    .or_else(|| worker.capabilities.first())
                    .map(|c| c.name.as_str())
                    .unwrap_or("unknown");
                format!("{} (model: {})", worker.worker_id, model)
            }
            None => "no node available".to_string(),
        };
        routing.insert(task_type.to_string(), description);
    }

    Json(RoutingResponse {
        routing,
        nodes: state.registry.snapshot(),
    })
}
