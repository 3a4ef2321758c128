//! Progress reporting shared by the data sources and the runner

use std::sync::Arc;

/// Receives `(fraction in [0, 1], human-readable message)` checkpoints
pub type ProgressCallback = Arc<dyn Fn(f64, &str) + Send + Sync>;

/// A callback that drops every event
pub fn noop() -> ProgressCallback {
    Arc::new(|_: f64, _: &str| {})
}

/// A callback that forwards events to `tracing` at debug level
pub fn log_progress() -> ProgressCallback {
    Arc::new(|progress: f64, message: &str| {
        tracing::debug!(progress, message, "Backtest progress");
    })
}
