//! Process-wide in-memory table of workers: capabilities, load, liveness.
//!
//! A single `parking_lot::RwLock` guards the table (teacher's
//! `Arc<RwLock<HashMap<..>>>` shared-state pattern, narrowed from an async
//! `tokio::sync::RwLock` to a sync one because every critical section here
//! is pure in-memory bookkeeping with no `.await` inside it). Reads proceed
//! in parallel; mutations are exclusive; every external view is a clone, so
//! no caller can observe a partially-applied mutation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use mesh_types::{
    HeartbeatRequest, MeshEvent, MeshEventType, RegisterRequest, TaskType, Worker, WorkerStatus,
    BUSY_THRESHOLD,
};
use parking_lot::RwLock;
use serde_json::json;

use crate::error::MeshError;
use crate::hub::EventHub;
use crate::time::now_ms;

pub struct Registry {
    rows: RwLock<HashMap<String, Worker>>,
    hub: Arc<EventHub>,
    heartbeat_timeout_ms: u64,
}

impl Registry {
    pub fn new(hub: Arc<EventHub>, heartbeat_timeout_ms: u64) -> Self {
        Registry {
            rows: RwLock::new(HashMap::new()),
            hub,
            heartbeat_timeout_ms,
        }
    }

    /// Upserts by `worker_id`. Re-registration atomically replaces every
    /// field and resets load/status, regardless of what was there before.
    pub fn register(&self, req: RegisterRequest) -> Worker {
        let worker = Worker::from_register(req, now_ms());
        {
            let mut rows = self.rows.write();
            rows.insert(worker.worker_id.clone(), worker.clone());
        }
        self.hub.broadcast(MeshEvent::new(
            MeshEventType::NodeRegistered,
            now_ms(),
            json!(worker),
        ));
        worker
    }

    /// Updates liveness/load for a known worker. `Err(UnknownNode)` signals
    /// the caller (the `/heartbeat` handler) to reply 404 so the worker
    /// re-registers.
    pub fn heartbeat(
        &self,
        req: &HeartbeatRequest,
    ) -> Result<(), MeshError> {
        let mut rows = self.rows.write();
        let worker = rows.get_mut(&req.worker_id).ok_or(MeshError::UnknownNode)?;
        let changed = worker.status != req.status || worker.active_tasks != req.active_tasks;
        worker.status = req.status;
        worker.active_tasks = req.active_tasks;
        worker.last_heartbeat_ms = now_ms();
        if changed {
            let snapshot = worker.clone();
            drop(rows);
            self.hub.broadcast(MeshEvent::new(
                MeshEventType::NodeStatus,
                now_ms(),
                json!(snapshot),
            ));
        }
        Ok(())
    }

    /// Increments load and re-derives `busy`/`idle` across the threshold.
    /// A no-op on rows that are currently `offline` (never mutate a row the
    /// eviction loop has already retired).
    pub fn increment_load(&self, worker_id: &str) {
        let mut rows = self.rows.write();
        if let Some(worker) = rows.get_mut(worker_id) {
            if worker.status == WorkerStatus::Offline {
                return;
            }
            worker.active_tasks += 1;
            restage_status(worker);
        }
    }

    /// Decrements load, floored at zero. A no-op on `offline` rows.
    pub fn decrement_load(&self, worker_id: &str) {
        let mut rows = self.rows.write();
        if let Some(worker) = rows.get_mut(worker_id) {
            if worker.status == WorkerStatus::Offline {
                return;
            }
            worker.active_tasks = worker.active_tasks.saturating_sub(1);
            restage_status(worker);
        }
    }

    /// Marks a worker transiently suspect after a dispatch failure. Not
    /// persisted across heartbeats: the next heartbeat overwrites `status`
    /// with whatever the worker reports.
    pub fn mark_suspect(&self, worker_id: &str) {
        let mut rows = self.rows.write();
        if let Some(worker) = rows.get_mut(worker_id) {
            if worker.status != WorkerStatus::Offline {
                worker.status = WorkerStatus::Overloaded;
            }
        }
    }

    /// Deep copy of every row. Callers never observe a partial update: the
    /// whole table is cloned under one read-lock acquisition.
    pub fn snapshot(&self) -> Vec<Worker> {
        self.rows.read().values().cloned().collect()
    }

    /// Tiered, loaded-aware selection. See module docs on `mesh_core::router`
    /// for the full algorithm; this just evaluates liveness against the
    /// current wall clock, since `offline` is defined lazily.
    pub fn find_best(
        &self,
        task_type: TaskType,
        model_hint: Option<&str>,
        exclude: &HashSet<String>,
    ) -> Option<Worker> {
        let rows = self.rows.read();
        let now = now_ms();
        crate::router::select(rows.values(), task_type, model_hint, exclude, now, self.heartbeat_timeout_ms)
    }

    /// Sweeps the table for workers silent past the heartbeat timeout and
    /// flips them to `offline`. Returns the ids that were flipped, for the
    /// caller to log. Entries are retained, never deleted, so the dashboard
    /// can still observe a dead node.
    pub fn evict_stale(&self) -> Vec<String> {
        let now = now_ms();
        let mut flipped = Vec::new();
        {
            let mut rows = self.rows.write();
            for worker in rows.values_mut() {
                if worker.status != WorkerStatus::Offline
                    && now.saturating_sub(worker.last_heartbeat_ms) >= self.heartbeat_timeout_ms
                {
                    worker.status = WorkerStatus::Offline;
                    flipped.push(worker.worker_id.clone());
                }
            }
        }
        for worker_id in &flipped {
            self.hub.broadcast(MeshEvent::new(
                MeshEventType::NodeStatus,
                now_ms(),
                json!({"worker_id": worker_id, "status": "offline"}),
            ));
        }
        flipped
    }
}

/// Re-derives `idle`/`busy` from the active-task threshold. Never promotes
/// out of `offline` or `overloaded` — those are set/cleared by their own
/// rules (eviction, heartbeat), not by load deltas.
fn restage_status(worker: &mut Worker) {
    if worker.status == WorkerStatus::Offline || worker.status == WorkerStatus::Overloaded {
        return;
    }
    worker.status = if worker.active_tasks >= BUSY_THRESHOLD {
        WorkerStatus::Busy
    } else {
        WorkerStatus::Idle
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::ModelCapability;
    use std::collections::HashSet as Set;

    fn reg() -> Registry {
        Registry::new(Arc::new(EventHub::new()), HEARTBEAT_TIMEOUT_MS_TEST)
    }

    const HEARTBEAT_TIMEOUT_MS_TEST: u64 = 15_000;

    fn cap(name: &str, types: &[TaskType]) -> ModelCapability {
        ModelCapability {
            name: name.to_string(),
            types: types.iter().copied().collect(),
        }
    }

    fn register(registry: &Registry, id: &str, caps: Vec<ModelCapability>) {
        registry.register(RegisterRequest {
            worker_id: id.to_string(),
            host: "127.0.0.1".into(),
            agent_port: 9000,
            backend_port: 11434,
            capabilities: caps,
        });
    }

    #[test]
    fn register_resets_active_tasks_to_zero() {
        let registry = reg();
        register(&registry, "a", vec![cap("mistral", &[TaskType::Text])]);
        registry.increment_load("a");
        registry.increment_load("a");
        register(&registry, "a", vec![cap("mistral", &[TaskType::Text])]);
        let row = registry.snapshot().into_iter().find(|w| w.worker_id == "a").unwrap();
        assert_eq!(row.active_tasks, 0);
        assert_eq!(row.status, WorkerStatus::Idle);
    }

    #[test]
    fn load_never_goes_negative() {
        let registry = reg();
        register(&registry, "a", vec![]);
        registry.decrement_load("a");
        registry.decrement_load("a");
        let row = registry.snapshot().into_iter().find(|w| w.worker_id == "a").unwrap();
        assert_eq!(row.active_tasks, 0);
    }

    #[test]
    fn busy_threshold_flips_status_both_ways() {
        let registry = reg();
        register(&registry, "a", vec![]);
        for _ in 0..BUSY_THRESHOLD {
            registry.increment_load("a");
        }
        let row = registry.snapshot().into_iter().find(|w| w.worker_id == "a").unwrap();
        assert_eq!(row.status, WorkerStatus::Busy);

        registry.decrement_load("a");
        let row = registry.snapshot().into_iter().find(|w| w.worker_id == "a").unwrap();
        assert_eq!(row.status, WorkerStatus::Idle);
    }

    #[test]
    fn suspect_is_cleared_by_next_heartbeat() {
        let registry = reg();
        register(&registry, "a", vec![]);
        registry.mark_suspect("a");
        let row = registry.snapshot().into_iter().find(|w| w.worker_id == "a").unwrap();
        assert_eq!(row.status, WorkerStatus::Overloaded);

        registry
            .heartbeat(&HeartbeatRequest {
                worker_id: "a".into(),
                status: WorkerStatus::Idle,
                active_tasks: 0,
            })
            .unwrap();
        let row = registry.snapshot().into_iter().find(|w| w.worker_id == "a").unwrap();
        assert_eq!(row.status, WorkerStatus::Idle);
    }

    #[test]
    fn heartbeat_from_unknown_worker_is_rejected() {
        let registry = reg();
        let err = registry
            .heartbeat(&HeartbeatRequest {
                worker_id: "ghost".into(),
                status: WorkerStatus::Idle,
                active_tasks: 0,
            })
            .unwrap_err();
        assert!(matches!(err, MeshError::UnknownNode));
    }

    #[test]
    fn find_best_never_returns_excluded_or_overloaded() {
        let registry = reg();
        register(&registry, "a", vec![cap("mistral", &[TaskType::Text])]);
        registry.mark_suspect("a");
        let mut exclude = Set::new();
        exclude.insert("b".to_string());
        let result = registry.find_best(TaskType::Text, None, &exclude);
        assert!(result.is_none());
    }

    #[test]
    fn mutations_do_not_touch_offline_rows() {
        let registry = reg();
        register(&registry, "a", vec![]);
        {
            let mut rows = registry.rows.write();
            rows.get_mut("a").unwrap().status = WorkerStatus::Offline;
            rows.get_mut("a").unwrap().last_heartbeat_ms = 0;
        }
        registry.increment_load("a");
        let row = registry.snapshot().into_iter().find(|w| w.worker_id == "a").unwrap();
        assert_eq!(row.active_tasks, 0);
        assert_eq!(row.status, WorkerStatus::Offline);
    }
}
