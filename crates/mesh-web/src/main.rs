//! Task-routing mesh coordinator: HTTP/JSON ingress for clients and
//! workers, a WebSocket event feed for the dashboard, a liveness eviction
//! timer, and a stats ticker.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use mesh_core::Config;
use mesh_types::{MeshEvent, MeshEventType};
use mesh_web::discovery::{DiscoveryHandle, NullDiscovery};
use mesh_web::routes;
use mesh_web::state::AppState;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mesh_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting task-routing mesh coordinator");

    let config = Config::from_env();
    let state = AppState::new(config.clone());

    spawn_eviction_loop(state.clone());
    spawn_stats_ticker(state.clone());

    NullDiscovery.advertise("_echo-mesh._tcp", config.port);

    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| {
        let manifest_dir = env!("CARGO_MANIFEST_DIR");
        format!("{}/../../static", manifest_dir)
    });
    tracing::info!(static_dir, "serving dashboard assets from");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_task_router(state.clone()))
        .merge(routes::create_worker_router(state.clone()))
        .merge(routes::create_debug_router(state.clone()))
        .merge(routes::create_ws_router(state.clone()))
        .merge(routes::create_dashboard_router(static_dir.into()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Mesh coordinator listening on http://{}", addr);
    tracing::info!("  POST /task              - unary task");
    tracing::info!("  POST /task/stream       - streaming task (SSE)");
    tracing::info!("  POST /pipeline          - multi-step pipeline");
    tracing::info!("  POST /register          - worker registration");
    tracing::info!("  POST /heartbeat         - worker heartbeat");
    tracing::info!("  GET  /status            - registry snapshot");
    tracing::info!("  GET  /debug/routing     - per-type routing dry-run");
    tracing::info!("  GET  /ws                - dashboard event feed");
    tracing::info!("  GET  /dashboard/        - dashboard UI");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Every `eviction_interval_ms`, flips any worker silent past the
/// heartbeat timeout to `offline`. Rows are retained, never deleted.
fn spawn_eviction_loop(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(state.config.eviction_interval_ms));
        loop {
            ticker.tick().await;
            let evicted = state.registry.evict_stale();
            for worker_id in evicted {
                tracing::warn!(worker_id, "worker evicted: no heartbeat within timeout");
            }
        }
    });
}

/// Every `stats_interval_s`, emits a `stats` event — but only when at
/// least one dashboard subscriber is actually listening.
fn spawn_stats_ticker(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(state.config.stats_interval_s));
        loop {
            ticker.tick().await;
            if state.hub.subscriber_count() == 0 {
                continue;
            }
            let snapshot = state.stats.snapshot();
            state.hub.broadcast(MeshEvent::new(
                MeshEventType::Stats,
                mesh_core::time::now_ms(),
                json!(snapshot),
            ));
        }
    });
}
