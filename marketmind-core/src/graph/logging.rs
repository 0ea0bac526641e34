//! Structured logging for graph runs, via `tracing`.

use std::fmt::Debug;
use std::time::Duration;

use crate::graph::Next;

/// Logs the start of a graph run.
pub fn log_graph_start(thread_id: Option<&str>) {
    tracing::info!(thread_id = thread_id.unwrap_or("-"), "graph run started");
}

/// Logs successful completion of a graph run.
pub fn log_graph_complete(thread_id: Option<&str>, steps: usize, elapsed: Duration) {
    tracing::info!(
        thread_id = thread_id.unwrap_or("-"),
        steps,
        elapsed_ms = elapsed.as_millis() as u64,
        "graph run completed"
    );
}

/// Logs a graph run failure.
pub fn log_graph_error(thread_id: Option<&str>, node_id: &str, error: &dyn std::error::Error) {
    tracing::error!(
        thread_id = thread_id.unwrap_or("-"),
        node_id,
        error = %error,
        "graph run failed"
    );
}

/// Logs the start of a node execution.
pub fn log_node_start(node_id: &str) {
    tracing::debug!(node_id, "node started");
}

/// Logs completion of a node execution.
pub fn log_node_complete(node_id: &str, elapsed: Duration) {
    tracing::debug!(node_id, elapsed_ms = elapsed.as_millis() as u64, "node completed");
}

/// Logs the routing decision produced after a node runs.
pub fn log_state_update<S: Debug>(node_id: &str, next: &Next, state: &S) {
    tracing::trace!(node_id, next = ?next, state = ?state, "state updated");
}
