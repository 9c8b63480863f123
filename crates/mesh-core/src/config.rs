//! Process configuration, read from the environment the way the teacher's
//! `ob-poc-web` main reads `SERVER_PORT` / `DATABASE_URL`: a fallible parse
//! of an env var with a hard-coded default, no config file, no CLI parser.

/// Status is `offline` once this many milliseconds pass without a heartbeat.
pub const HEARTBEAT_TIMEOUT_MS: u64 = 15_000;
/// How often the eviction loop sweeps the registry for stale workers.
pub const EVICTION_INTERVAL_MS: u64 = 5_000;
/// How often the stats ticker emits a `stats` event, when subscribers exist.
pub const STATS_INTERVAL_S: u64 = 3;
/// WebSocket keepalive probe interval.
pub const KEEPALIVE_INTERVAL_S: u64 = 30;
/// Per-subscriber outbound event queue depth.
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub heartbeat_timeout_ms: u64,
    pub eviction_interval_ms: u64,
    pub task_timeout_s: u64,
    pub stats_interval_s: u64,
    pub keepalive_interval_s: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8787,
            heartbeat_timeout_ms: HEARTBEAT_TIMEOUT_MS,
            eviction_interval_ms: EVICTION_INTERVAL_MS,
            task_timeout_s: 180,
            stats_interval_s: STATS_INTERVAL_S,
            keepalive_interval_s: KEEPALIVE_INTERVAL_S,
        }
    }
}

impl Config {
    /// Loads overrides from the environment, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let default = Config::default();
        Config {
            port: env_or("PORT", default.port),
            heartbeat_timeout_ms: env_or("HEARTBEAT_TIMEOUT_MS", default.heartbeat_timeout_ms),
            eviction_interval_ms: env_or("EVICTION_INTERVAL_MS", default.eviction_interval_ms),
            task_timeout_s: env_or("TASK_TIMEOUT_S", default.task_timeout_s),
            stats_interval_s: env_or("STATS_INTERVAL_S", default.stats_interval_s),
            keepalive_interval_s: env_or("KEEPALIVE_INTERVAL_S", default.keepalive_interval_s),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
