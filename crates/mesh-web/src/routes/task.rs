//! `/task`, `/task/stream`, and `/pipeline` — the client-facing ingress.

use std::collections::HashSet;
use std::convert::Infallible;

use axum::{
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::Stream;
use http::StatusCode;
use mesh_core::{router, MeshError, PipelineExecutor};
use mesh_types::{MeshEvent, MeshEventType, PipelineRequest, TaskChunk, TaskRequest};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use uuid::Uuid;

use mesh_core::time::now_ms;

use crate::error::ApiError;
use crate::state::AppState;

pub fn create_task_router(state: AppState) -> Router {
    Router::new()
        .route("/task", post(submit_task))
        .route("/task/stream", post(stream_task))
        .route("/pipeline", post(submit_pipeline))
        .with_state(state)
}

async fn submit_task(
    axum::extract::State(state): axum::extract::State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Result<Json<mesh_types::TaskResult>, ApiError> {
    if !req.is_valid() {
        return Err(MeshError::BadRequest("prompt must not be empty".to_string()).into());
    }
    let task_id = req.task_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

    let result = router::dispatch_unary(&state.registry, &state.forwarder, task_id, &req).await?;

    state.stats.record_task(result.latency_ms);
    state.hub.broadcast(MeshEvent::new(
        MeshEventType::TaskRouted,
        now_ms(),
        json!({"task_id": result.task_id, "routed_to": result.routed_to, "model_used": result.model_used}),
    ));
    state
        .hub
        .broadcast(MeshEvent::new(MeshEventType::TaskDone, now_ms(), json!(result)));

    Ok(Json(result))
}

async fn stream_task(
    axum::extract::State(state): axum::extract::State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if !req.is_valid() {
        return Err(MeshError::BadRequest("prompt must not be empty".to_string()).into());
    }
    // Selection happens eagerly so a 503 can still be returned instead of
    // upgrading to a stream with nothing to send.
    if state
        .registry
        .find_best(req.task_type(), req.model_hint.as_deref(), &HashSet::new())
        .is_none()
    {
        return Err(MeshError::NoWorker.into());
    }

    let task_id = req.task_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    let (tx, rx) = mpsc::unbounded_channel::<TaskChunk>();

    let registry = state.registry.clone();
    let forwarder = state.forwarder.clone();
    let stats = state.stats.clone();
    let req_for_task = req.clone();

    tokio::spawn(async move {
        let outcome = router::dispatch_stream(&registry, &forwarder, task_id, &req_for_task, |chunk| {
            if chunk.done {
                if let Some(latency) = chunk.latency_ms {
                    stats.record_task(latency);
                }
            }
            let _ = tx.send(chunk);
        })
        .await;
        if let Err(err) = outcome {
            tracing::warn!(error = %err, "stream dispatch terminated early");
        }
    });

    let stream = UnboundedReceiverStream::new(rx).map(|chunk| {
        let data = serde_json::to_string(&chunk).unwrap_or_default();
        Ok(Event::default().event("message").data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn submit_pipeline(
    axum::extract::State(state): axum::extract::State<AppState>,
    Json(req): Json<PipelineRequest>,
) -> Response {
    if !req.is_valid() {
        return ApiError(MeshError::BadRequest(
            "pipeline requires at least one step and a non-empty initial_input".to_string(),
        ))
        .into_response();
    }

    let executor = PipelineExecutor::new(&state.registry, &state.forwarder, &state.hub, &state.stats);
    match executor.run(req).await {
        Ok(result) if result.success => (StatusCode::OK, Json(result)).into_response(),
        Ok(result) => (StatusCode::INTERNAL_SERVER_ERROR, Json(result)).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}
