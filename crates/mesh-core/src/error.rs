use thiserror::Error;

/// Error kinds produced by the routing mesh. Transport/decode/worker-failure
/// are normally recovered locally by the router's failover loop; the rest
/// surface to the HTTP layer.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("no worker available")]
    NoWorker,

    #[error("transport error talking to {worker_id}: {message}")]
    Transport { worker_id: String, message: String },

    #[error("decode error from {worker_id}: {message}")]
    Decode { worker_id: String, message: String },

    #[error("worker {worker_id} reported failure: {message}")]
    WorkerFailure { worker_id: String, message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("unknown node, please re-register")]
    UnknownNode,
}

impl MeshError {
    /// True for errors the router's failover loop should retry against a
    /// different worker rather than surface immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MeshError::Transport { .. } | MeshError::Decode { .. } | MeshError::WorkerFailure { .. }
        )
    }
}
