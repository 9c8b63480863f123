//! Stateless worker selection over the registry, plus the retry/failover
//! loop for unary dispatch and the single-shot streaming dispatch.

use std::collections::HashSet;
use std::time::Instant;

use mesh_types::{TaskChunk, TaskRequest, TaskResult, TaskType, Worker, WorkerStatus};

use crate::error::MeshError;
use crate::forwarder::Forwarder;
use crate::registry::Registry;

/// Evaluates every candidate against the tiered predicates and returns the
/// winner of the highest non-empty tier, realized as a loop over a mutable
/// set of three buckets rather than recursion so stack depth is bounded by
/// the number of workers, not the number of failover attempts.
///
/// - Tier 1 (exact): `model_hint` is set and the worker serves that model.
/// - Tier 2 (capability): `task_type != Any` and the worker declares it.
/// - Tier 3 (any): any live, non-excluded, non-suspect worker.
///
/// A candidate is placed in the *highest* tier it qualifies for and is not
/// reconsidered for a lower one. Within the winning tier, ties on minimal
/// `active_tasks` break on ascending `worker_id` for determinism.
pub fn select<'a>(
    rows: impl Iterator<Item = &'a Worker>,
    task_type: TaskType,
    model_hint: Option<&str>,
    exclude: &HashSet<String>,
    now_ms: u64,
    heartbeat_timeout_ms: u64,
) -> Option<Worker> {
    let mut tier1: Vec<&Worker> = Vec::new();
    let mut tier2: Vec<&Worker> = Vec::new();
    let mut tier3: Vec<&Worker> = Vec::new();

    for worker in rows {
        if exclude.contains(&worker.worker_id) {
            continue;
        }
        if worker.status == WorkerStatus::Overloaded {
            continue;
        }
        let alive = worker.status != WorkerStatus::Offline
            && now_ms.saturating_sub(worker.last_heartbeat_ms) < heartbeat_timeout_ms;
        if !alive {
            continue;
        }

        if let Some(hint) = model_hint {
            if worker.serves_model(hint) {
                tier1.push(worker);
                continue;
            }
        }
        if task_type != TaskType::Any && worker.supports_type(task_type) {
            tier2.push(worker);
            continue;
        }
        tier3.push(worker);
    }

    pick_lowest_load(tier1)
        .or_else(|| pick_lowest_load(tier2))
        .or_else(|| pick_lowest_load(tier3))
        .cloned()
}

fn pick_lowest_load<'a>(tier: Vec<&'a Worker>) -> Option<&'a Worker> {
    tier.into_iter()
        .min_by(|a, b| a.active_tasks.cmp(&b.active_tasks).then_with(|| a.worker_id.cmp(&b.worker_id)))
}

/// Picks the model name to report as `model_used`: the matched hint if one
/// was given, else the capability whose types cover `task_type`, else the
/// worker's first declared model.
fn resolve_model(worker: &Worker, task_type: TaskType, model_hint: Option<&str>) -> String {
    if let Some(hint) = model_hint {
        if worker.serves_model(hint) {
            return hint.to_string();
        }
    }
    if task_type != TaskType::Any {
        if let Some(cap) = worker.capabilities.iter().find(|c| c.types.contains(&task_type)) {
            return cap.name.clone();
        }
    }
    worker
        .capabilities
        .first()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

/// RAII guard releasing an `increment_load` no matter how the dispatch
/// exits — success, failover retry, or the enclosing future being dropped
/// on client cancellation. Exactly one decrement per increment either way.
struct LoadGuard<'r> {
    registry: &'r Registry,
    worker_id: String,
}

impl<'r> Drop for LoadGuard<'r> {
    fn drop(&mut self) {
        self.registry.decrement_load(&self.worker_id);
    }
}

/// Unary failover loop: select, dispatch, and on any retryable error mark
/// the worker suspect, exclude it, and reselect — realized as a `loop`
/// over a mutable exclusion set, never tail recursion.
pub async fn dispatch_unary(
    registry: &Registry,
    forwarder: &Forwarder,
    task_id: String,
    req: &TaskRequest,
) -> Result<TaskResult, MeshError> {
    let mut exclude = HashSet::new();
    let start = Instant::now();

    loop {
        let worker = registry
            .find_best(req.task_type(), req.model_hint.as_deref(), &exclude)
            .ok_or(MeshError::NoWorker)?;

        registry.increment_load(&worker.worker_id);
        let _guard = LoadGuard {
            registry,
            worker_id: worker.worker_id.clone(),
        };

        let model_used = resolve_model(&worker, req.task_type(), req.model_hint.as_deref());
        let mut task_req = req.clone();
        task_req.task_id = Some(task_id.clone());

        match forwarder.forward_unary(&worker, &task_req).await {
            Ok(mut result) => {
                result.routed_to = worker.worker_id.clone();
                result.task_type = req.task_type();
                result.model_used = model_used;
                result.latency_ms = start.elapsed().as_millis() as u64;
                result.success = true;
                return Ok(result);
            }
            Err(err) => {
                registry.mark_suspect(&worker.worker_id);
                exclude.insert(worker.worker_id.clone());
                tracing::warn!(
                    worker_id = %worker.worker_id,
                    error = %err,
                    "dispatch failed, excluding worker and retrying"
                );
            }
        }
    }
}

/// Streaming dispatch: selection happens once. No failover across chunks —
/// once bytes have reached the client, a retry would produce a visible
/// discontinuity, and buffering the whole stream to allow one would defeat
/// the latency purpose of streaming in the first place.
pub async fn dispatch_stream<F>(
    registry: &Registry,
    forwarder: &Forwarder,
    task_id: String,
    req: &TaskRequest,
    mut on_chunk: F,
) -> Result<(), MeshError>
where
    F: FnMut(TaskChunk),
{
    let worker = registry
        .find_best(req.task_type(), req.model_hint.as_deref(), &HashSet::new())
        .ok_or(MeshError::NoWorker)?;

    registry.increment_load(&worker.worker_id);
    let _guard = LoadGuard {
        registry,
        worker_id: worker.worker_id.clone(),
    };

    let start = Instant::now();
    let worker_id = worker.worker_id.clone();
    let mut task_req = req.clone();
    task_req.task_id = Some(task_id);

    let result = forwarder
        .forward_stream(&worker, &task_req, |mut chunk| {
            chunk.routed_to = worker_id.clone();
            if chunk.done {
                chunk.latency_ms = Some(start.elapsed().as_millis() as u64);
            }
            on_chunk(chunk);
        })
        .await;

    if result.is_err() {
        registry.mark_suspect(&worker.worker_id);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::ModelCapability;

    fn worker(id: &str, active_tasks: u32, caps: Vec<ModelCapability>) -> Worker {
        Worker {
            worker_id: id.to_string(),
            host: "127.0.0.1".into(),
            agent_port: 9000,
            backend_port: 11434,
            models: caps.iter().map(|c| c.name.clone()).collect(),
            capabilities: caps,
            status: WorkerStatus::Idle,
            active_tasks,
            last_heartbeat_ms: 1_000,
            registered_at_ms: 0,
        }
    }

    fn cap(name: &str, types: &[TaskType]) -> ModelCapability {
        ModelCapability {
            name: name.to_string(),
            types: types.iter().copied().collect(),
        }
    }

    #[test]
    fn tier1_beats_tier2_beats_tier3() {
        let a = worker("a", 0, vec![cap("mistral", &[TaskType::Text, TaskType::Summarize])]);
        let b = worker("b", 0, vec![cap("codellama", &[TaskType::Code, TaskType::Text])]);
        let rows = vec![a, b];
        let picked = select(
            rows.iter(),
            TaskType::Text,
            Some("codellama"),
            &HashSet::new(),
            1_000,
            15_000,
        )
        .unwrap();
        assert_eq!(picked.worker_id, "b");
    }

    #[test]
    fn tier_selection_prefers_lowest_load_within_tier() {
        let a = worker("a", 3, vec![cap("mistral", &[TaskType::Code])]);
        let b = worker("b", 1, vec![cap("mistral2", &[TaskType::Code])]);
        let rows = vec![a, b];
        let picked = select(rows.iter(), TaskType::Code, None, &HashSet::new(), 1_000, 15_000).unwrap();
        assert_eq!(picked.worker_id, "b");
    }

    #[test]
    fn excluded_and_overloaded_workers_are_never_returned() {
        let mut a = worker("a", 0, vec![cap("mistral", &[TaskType::Text])]);
        a.status = WorkerStatus::Overloaded;
        let b = worker("b", 0, vec![cap("mistral2", &[TaskType::Text])]);
        let mut exclude = HashSet::new();
        exclude.insert("b".to_string());
        let rows = vec![a, b];
        let picked = select(rows.iter(), TaskType::Text, None, &exclude, 1_000, 15_000);
        assert!(picked.is_none());
    }

    #[test]
    fn stale_heartbeat_is_treated_as_offline_even_if_status_lags() {
        let mut w = worker("a", 0, vec![cap("mistral", &[TaskType::Text])]);
        w.last_heartbeat_ms = 0;
        let rows = vec![w];
        // now_ms - last_heartbeat_ms = 20_000 >= 15_000 timeout
        let picked = select(rows.iter(), TaskType::Text, None, &HashSet::new(), 20_000, 15_000);
        assert!(picked.is_none());
    }

    #[test]
    fn no_candidates_is_none() {
        let rows: Vec<Worker> = vec![];
        assert!(select(rows.iter(), TaskType::Any, None, &HashSet::new(), 0, 15_000).is_none());
    }
}
