use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::task::TaskType;

/// A single model a worker serves, and the task types it handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapability {
    pub name: String,
    pub types: HashSet<TaskType>,
}

/// Liveness/load status of a worker as observed by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Overloaded,
    Offline,
}

/// Number of active tasks at or above which a worker is considered busy.
pub const BUSY_THRESHOLD: u32 = 5;

/// Payload sent by a worker on `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub worker_id: String,
    pub host: String,
    pub agent_port: u16,
    pub backend_port: u16,
    #[serde(default)]
    pub capabilities: Vec<ModelCapability>,
}

/// Payload sent by a worker on `POST /heartbeat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub worker_id: String,
    pub status: WorkerStatus,
    pub active_tasks: u32,
}

/// A full registry row, as returned by `snapshot()` and the `/status`
/// and `/debug/routing` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub worker_id: String,
    pub host: String,
    pub agent_port: u16,
    pub backend_port: u16,
    pub capabilities: Vec<ModelCapability>,
    /// Flat list of model names derived from `capabilities`, kept in sync
    /// by the registry so Tier-1 (exact model) matching is a single scan.
    pub models: Vec<String>,
    pub status: WorkerStatus,
    pub active_tasks: u32,
    pub last_heartbeat_ms: u64,
    pub registered_at_ms: u64,
}

impl Worker {
    pub fn from_register(req: RegisterRequest, now_ms: u64) -> Self {
        let models = req.capabilities.iter().map(|c| c.name.clone()).collect();
        Worker {
            worker_id: req.worker_id,
            host: req.host,
            agent_port: req.agent_port,
            backend_port: req.backend_port,
            capabilities: req.capabilities,
            models,
            status: WorkerStatus::Idle,
            active_tasks: 0,
            last_heartbeat_ms: now_ms,
            registered_at_ms: now_ms,
        }
    }

    pub fn supports_type(&self, task_type: TaskType) -> bool {
        self.capabilities.iter().any(|c| c.types.contains(&task_type))
    }

    pub fn serves_model(&self, model_hint: &str) -> bool {
        self.models.iter().any(|m| m == model_hint)
    }
}
