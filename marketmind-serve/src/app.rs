//! Axum app: shared state and the full HTTP + WebSocket router.

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;

use marketmind_core::{AgentRecordStore, McpBridge};
use marketmind_tasks::TaskLifecycleManager;

use crate::progress::ProgressBroadcaster;
use crate::{http, ws};

pub struct AppState {
    pub tasks: TaskLifecycleManager,
    pub progress: Arc<ProgressBroadcaster>,
    pub records: AgentRecordStore,
    pub agent_config_dir: PathBuf,
    pub mcp_bridge: Arc<McpBridge>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/analysis/single", post(http::submit_single))
        .route("/analysis/batch", post(http::submit_batch))
        .route("/analysis/tasks/:id/status", get(http::task_status))
        .route("/analysis/tasks/:id/result", get(http::task_result))
        .route("/analysis/tasks/:id/cancel", post(http::task_cancel))
        .route("/analysis/tasks/:id/mark-failed", post(http::task_mark_failed))
        .route("/analysis/tasks/:id", delete(http::task_delete))
        .route("/analysis/user/history", get(http::user_history))
        .route("/analysis/admin/cleanup-zombie-tasks", post(http::cleanup_zombie_tasks))
        .route("/agent-configs/:phase", get(http::get_agent_config))
        .route("/agent-configs/:phase", put(http::put_agent_config))
        .route("/analysis/ws/task/:task_id", get(ws::ws_task_progress))
        .route("/tools/mcp", get(http::list_mcp_tools))
        .route("/tools/mcp/:name/restart", post(http::restart_mcp_server))
        .with_state(state)
}
