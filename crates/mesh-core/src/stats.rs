use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Process-wide rolling stats counters. Lock-free: every field is an
/// independent atomic, so recording a task never contends with a snapshot.
pub struct Stats {
    total_tasks: AtomicU64,
    total_pipelines: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
    started_at: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_tasks: u64,
    pub total_pipelines: u64,
    pub avg_latency_ms: f64,
    pub uptime_s: u64,
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            total_tasks: AtomicU64::new(0),
            total_pipelines: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_task(&self, latency_ms: u64) {
        self.total_tasks.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pipeline(&self, latency_ms: u64) {
        self.total_pipelines.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let count = self.latency_count.load(Ordering::Relaxed);
        let sum = self.latency_sum_ms.load(Ordering::Relaxed);
        let avg_latency_ms = if count > 0 { sum as f64 / count as f64 } else { 0.0 };
        StatsSnapshot {
            total_tasks: self.total_tasks.load(Ordering::Relaxed),
            total_pipelines: self.total_pipelines.load(Ordering::Relaxed),
            avg_latency_ms,
            uptime_s: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
