//! Maps `mesh_core::MeshError` onto HTTP responses. Kept at the web layer
//! so `mesh-core` stays framework-agnostic (the teacher's root `ob-poc`
//! crate only gains `axum` behind its optional `server` feature).

use axum::{http::StatusCode, response::IntoResponse, Json};
use mesh_core::MeshError;
use serde_json::json;

pub struct ApiError(pub MeshError);

impl From<MeshError> for ApiError {
    fn from(err: MeshError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            MeshError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MeshError::NoWorker => StatusCode::SERVICE_UNAVAILABLE,
            MeshError::UnknownNode => StatusCode::NOT_FOUND,
            MeshError::Transport { .. }
            | MeshError::Decode { .. }
            | MeshError::WorkerFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            MeshError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
