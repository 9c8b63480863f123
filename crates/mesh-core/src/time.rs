use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Nothing in this process persists
/// across restarts, so wall-clock monotonicity beyond "newer heartbeats
/// have larger values" is not required.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}
