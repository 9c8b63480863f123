//! Handler-level integration tests driven through `tower::ServiceExt::oneshot`
//! against the real `Router` — no socket involved, per the teacher's `tower`
//! dependency already present for exactly this.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mesh_core::Config;
use mesh_web::routes;
use mesh_web::state::AppState;
use tower::ServiceExt;

fn app() -> Router {
    let state = AppState::new(Config::default());
    Router::new()
        .merge(routes::create_task_router(state.clone()))
        .merge(routes::create_worker_router(state.clone()))
        .merge(routes::create_debug_router(state))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn empty_prompt_is_bad_request() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/task")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"prompt":""}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn no_worker_is_service_unavailable() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/task")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"prompt":"hello","type":"text"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn missing_worker_id_on_register_is_bad_request() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"worker_id":"","host":"127.0.0.1","agent_port":9000,"backend_port":11434,"capabilities":[]}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_then_status_reports_the_worker() {
    let state = AppState::new(Config::default());
    let app = Router::new()
        .merge(routes::create_worker_router(state.clone()));

    let register_body = r#"{
        "worker_id":"worker-a",
        "host":"127.0.0.1",
        "agent_port":9000,
        "backend_port":11434,
        "capabilities":[{"name":"mistral","types":["text","summarize"]}]
    }"#;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(register_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["node_count"], 1);
    assert_eq!(json["nodes"][0]["worker_id"], "worker-a");
}

#[tokio::test]
async fn heartbeat_from_unknown_worker_is_not_found() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/heartbeat")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"worker_id":"ghost","status":"idle","active_tasks":0}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn debug_routing_reports_no_node_available_when_empty() {
    let response = app()
        .oneshot(Request::builder().uri("/debug/routing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["routing"]["text"], "no node available");
}

#[tokio::test]
async fn pipeline_with_no_steps_is_bad_request() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pipeline")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"steps":[],"initial_input":"hello"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pipeline_with_empty_initial_input_is_bad_request() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pipeline")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"steps":[{"type":"text"}],"initial_input":""}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
