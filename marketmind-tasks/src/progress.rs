//! Push-based progress reporting: a [`NodeMiddleware`] that, after each
//! graph node completes, resolves `node_display_name -> percent` via the
//! agent record store's progress map and forwards `(task_id, node_display_name, percent)`
//! to whatever sink the caller wired in (the task store, a WebSocket
//! broadcaster, or both).

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use marketmind_core::{AgentError, AnalysisState, Next, NodeMiddleware};

/// Receives push notifications as nodes complete. Implemented by callers that
/// need to fan progress out further (e.g. a WebSocket broadcaster); the task
/// store's own `update_progress` is always called regardless.
pub trait ProgressSink: Send + Sync {
    fn push(&self, task_id: &str, node_display_name: &str, percent: f64);
}

/// A no-op sink for callers that only need the task store updated.
pub struct NullProgressSink;
impl ProgressSink for NullProgressSink {
    fn push(&self, _task_id: &str, _node_display_name: &str, _percent: f64) {}
}

pub struct ProgressMiddleware {
    task_id: String,
    percent_map: HashMap<String, f64>,
    seq: AtomicU64,
    store: Arc<crate::store::TaskStore>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressMiddleware {
    pub fn new(
        task_id: String,
        percent_map: HashMap<String, f64>,
        store: Arc<crate::store::TaskStore>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            task_id,
            percent_map,
            seq: AtomicU64::new(0),
            store,
            sink,
        }
    }
}

#[async_trait]
impl NodeMiddleware<AnalysisState> for ProgressMiddleware {
    async fn around_run(
        &self,
        node_id: &str,
        state: AnalysisState,
        inner: Box<
            dyn FnOnce(AnalysisState) -> Pin<Box<dyn std::future::Future<Output = Result<(AnalysisState, Next), AgentError>> + Send>>
                + Send,
        >,
    ) -> Result<(AnalysisState, Next), AgentError> {
        let result = inner(state).await;
        if result.is_ok() {
            let percent = self.percent_map.get(node_id).copied().unwrap_or(0.0);
            let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            if let Err(e) = self.store.update_progress(&self.task_id, node_id, percent, seq) {
                tracing::warn!(task_id = %self.task_id, node = %node_id, error = %e, "progress update dropped");
            }
            self.sink.push(&self.task_id, node_id, percent);
        }
        result
    }
}
