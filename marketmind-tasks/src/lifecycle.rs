//! Task Lifecycle Manager (C6): creation, background execution (single and
//! batch), layered status/result lookup, cancellation, zombie reclamation,
//! and filtered history queries.

use std::path::PathBuf;
use std::sync::Arc;

use marketmind_core::{AgentGraphController, AnalysisState};

use crate::error::TaskError;
use crate::hydrator;
use crate::model::{AnalysisTask, HistoryFilter, HistoryPage, HydratedResult, StatusView, TaskStatus};
use crate::progress::{NullProgressSink, ProgressMiddleware, ProgressSink};
use crate::store::TaskStore;

pub const MAX_BATCH_SIZE: usize = 10;

pub struct TaskLifecycleManager {
    store: Arc<TaskStore>,
    controller: Arc<AgentGraphController>,
    runtime_dir: Option<PathBuf>,
    progress_sink: Arc<dyn ProgressSink>,
}

impl TaskLifecycleManager {
    pub fn new(store: Arc<TaskStore>, controller: Arc<AgentGraphController>) -> Self {
        Self {
            store,
            controller,
            runtime_dir: None,
            progress_sink: Arc::new(NullProgressSink),
        }
    }

    pub fn with_runtime_dir(mut self, dir: PathBuf) -> Self {
        self.runtime_dir = Some(dir);
        self
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = sink;
        self
    }

    /// Submits one analysis task; returns immediately once the task record
    /// is persisted. The analysis itself runs in the background.
    pub fn submit_single(
        &self,
        user_id: Option<String>,
        symbol: String,
        market: Option<String>,
        params: serde_json::Value,
        enabled_slugs: Vec<String>,
    ) -> Result<String, TaskError> {
        let task_id = uuid::Uuid::new_v4().to_string();
        let task = AnalysisTask::new(task_id.clone(), user_id, symbol, market, params);
        self.store.insert(task)?;
        self.spawn_analysis(task_id.clone(), enabled_slugs);
        Ok(task_id)
    }

    /// Submits up to [`MAX_BATCH_SIZE`] analyses as independently concurrent
    /// background tasks — not serialized.
    pub fn submit_batch(
        &self,
        user_id: Option<String>,
        symbols: Vec<(String, Option<String>)>,
        params: serde_json::Value,
        enabled_slugs: Vec<String>,
    ) -> Result<Vec<String>, TaskError> {
        if symbols.is_empty() || symbols.len() > MAX_BATCH_SIZE {
            return Err(TaskError::InvalidRequest(format!(
                "batch size must be 1..={}, got {}",
                MAX_BATCH_SIZE,
                symbols.len()
            )));
        }
        let mut task_ids = Vec::with_capacity(symbols.len());
        for (symbol, market) in symbols {
            let task_id = self.submit_single(user_id.clone(), symbol, market, params.clone(), enabled_slugs.clone())?;
            task_ids.push(task_id);
        }
        Ok(task_ids)
    }

    fn spawn_analysis(&self, task_id: String, enabled_slugs: Vec<String>) {
        let store = self.store.clone();
        let controller = self.controller.clone();
        let sink = self.progress_sink.clone();
        tokio::spawn(async move {
            let Some(task) = store.get(&task_id).ok().flatten() else {
                return;
            };
            let percent_map = controller
                .records()
                .progress_percent_map(&enabled_slugs)
                .unwrap_or_default();
            let middleware = Arc::new(ProgressMiddleware::new(task_id.clone(), percent_map, store.clone(), sink));
            let initial = AnalysisState {
                symbol: task.symbol.clone(),
                trade_date: chrono::Utc::now().format("%Y-%m-%d").to_string(),
                ..Default::default()
            };
            let run_result = controller
                .run_analysis_with_middleware(initial, &enabled_slugs, task_id.clone(), Some(middleware))
                .await;

            match run_result {
                Ok(final_state) => {
                    let reports = hydrator::reports_from_state(&final_state);
                    let result_value = serde_json::json!({
                        "reports": reports,
                        "final_trade_decision": final_state.final_trade_decision,
                        "structured_summary": final_state.structured_summary,
                    });
                    let _ = store.write_report(&task_id, result_value.clone());
                    let status = if final_state.last_error.is_some() {
                        TaskStatus::Failed
                    } else {
                        TaskStatus::Completed
                    };
                    let _ = store.set_terminal(&task_id, status, final_state.last_error.clone(), Some(result_value));
                }
                Err(e) => {
                    let _ = store.set_terminal(&task_id, TaskStatus::Failed, Some(e.to_string()), None);
                }
            }
        });
    }

    /// Layered status lookup: in-memory -> `analysis_tasks` -> `analysis_reports`.
    pub fn status(&self, task_id: &str) -> Result<StatusView, TaskError> {
        if let Some(task) = self.store.get(task_id)? {
            return Ok(StatusView {
                status: task.status.as_str().to_string(),
                progress: task.progress,
                current_step: task.current_step,
                elapsed_time: task.elapsed_seconds(),
                end_time: task.completed_at,
                last_error: task.last_error,
            });
        }
        if self.store.get_report(task_id)?.is_some() {
            return Ok(StatusView {
                status: "completed from history".to_string(),
                progress: 100.0,
                current_step: None,
                elapsed_time: None,
                end_time: None,
                last_error: None,
            });
        }
        Err(TaskError::NotFound(task_id.to_string()))
    }

    pub fn result(&self, task_id: &str) -> Result<HydratedResult, TaskError> {
        hydrator::hydrate(&self.store, task_id, self.runtime_dir.as_deref())
    }

    pub fn cancel(&self, task_id: &str) -> Result<(), TaskError> {
        self.store.request_cancel(task_id)
    }

    pub fn is_cancelled(&self, task_id: &str) -> bool {
        self.store.is_cancel_requested(task_id)
    }

    pub fn mark_failed(&self, task_id: &str, reason: String) -> Result<(), TaskError> {
        self.store.set_terminal(task_id, TaskStatus::Failed, Some(reason), None)
    }

    pub fn delete(&self, task_id: &str) -> Result<(), TaskError> {
        self.store.delete(task_id)
    }

    /// Reclaims tasks stuck in a running-like status past `max_running_hours`
    /// (clamped to the 1..=72 bound from the admin contract).
    pub fn reclaim_zombies(&self, max_running_hours: u32) -> Result<u64, TaskError> {
        let bounded = max_running_hours.clamp(1, 72);
        self.store.reclaim_zombies(bounded)
    }

    pub fn history(&self, filter: HistoryFilter) -> Result<HistoryPage, TaskError> {
        self.store.list_history(&filter)
    }
}
