//! Shared application state, following the teacher's `AppState` pattern:
//! a small `Clone` struct of `Arc`-wrapped shared resources, injected into
//! every handler via axum's `State` extractor rather than accessed
//! ambiently.

use std::sync::Arc;
use std::time::Duration;

use mesh_core::{Config, EventHub, Forwarder, Registry, Stats};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub hub: Arc<EventHub>,
    pub stats: Arc<Stats>,
    pub forwarder: Arc<Forwarder>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let hub = Arc::new(EventHub::new());
        let registry = Arc::new(Registry::new(hub.clone(), config.heartbeat_timeout_ms));
        let forwarder = Arc::new(Forwarder::new(Duration::from_secs(config.task_timeout_s)));
        AppState {
            registry,
            hub,
            stats: Arc::new(Stats::new()),
            forwarder,
            config: Arc::new(config),
        }
    }
}
