//! `GET /dashboard/` and `GET /dashboard` — static UI bundle and its
//! redirect. The bundle itself is out of scope; this serves a minimal
//! placeholder so the route shape and `ServeDir` wiring are real.

use std::path::PathBuf;

use axum::http::{header, StatusCode};
use axum::{routing::get, Router};
use tower_http::services::ServeDir;

pub fn create_dashboard_router(static_dir: PathBuf) -> Router {
    Router::new()
        .route(
            "/dashboard",
            get(|| async { (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/dashboard/")]) }),
        )
        .nest_service("/dashboard/", ServeDir::new(static_dir))
}
