// Orchestrator constants (no magic values)
use std::time::Duration;

/// Shortest pause between two monitor scans (50ms)
pub const DEFAULT_MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest pause between two monitor scans (1s)
/// The actual pause is drawn uniformly between min and max so pollers
/// started together do not wake together
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fallback text when a worker panics with a non-string payload
pub const UNKNOWN_PANIC_MESSAGE: &str = "Unknown panic";
