//! HTTP surface (§6): task submission/lookup/cancellation, history, zombie
//! reclamation, and declarative agent-config read/write.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use marketmind_tasks::{HistoryFilter, TaskStatus};

use crate::app::AppState;

#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(Envelope { success: true, data: Some(data), message: None })).into_response()
}

fn err(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(json!({"detail": detail.into()}))).into_response()
}

fn map_task_error(e: marketmind_tasks::TaskError) -> Response {
    match e {
        marketmind_tasks::TaskError::NotFound(id) => err(StatusCode::NOT_FOUND, format!("task not found: {id}")),
        marketmind_tasks::TaskError::InvalidRequest(m) => err(StatusCode::BAD_REQUEST, m),
        marketmind_tasks::TaskError::AlreadyTerminal => err(StatusCode::CONFLICT, "task already terminal"),
        marketmind_tasks::TaskError::Storage(m) => err(StatusCode::INTERNAL_SERVER_ERROR, m),
    }
}

#[derive(Debug, Deserialize)]
pub struct SingleRequest {
    pub symbol: String,
    pub market: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub enabled_slugs: Vec<String>,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub async fn submit_single(State(state): State<Arc<AppState>>, Json(req): Json<SingleRequest>) -> Response {
    match state.tasks.submit_single(req.user_id, req.symbol, req.market, req.params, req.enabled_slugs) {
        Ok(task_id) => ok(json!({"task_id": task_id})),
        Err(e) => map_task_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub symbols: Vec<String>,
    pub market: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub enabled_slugs: Vec<String>,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub async fn submit_batch(State(state): State<Arc<AppState>>, Json(req): Json<BatchRequest>) -> Response {
    let symbols: Vec<(String, Option<String>)> = req.symbols.into_iter().map(|s| (s, req.market.clone())).collect();
    match state.tasks.submit_batch(req.user_id, symbols, req.params, req.enabled_slugs) {
        Ok(task_ids) => {
            let batch_id = uuid::Uuid::new_v4().to_string();
            let mapping: Vec<_> = task_ids.iter().enumerate().map(|(i, id)| json!({"index": i, "task_id": id})).collect();
            ok(json!({"batch_id": batch_id, "task_ids": task_ids, "mapping": mapping}))
        }
        Err(e) => map_task_error(e),
    }
}

pub async fn task_status(State(state): State<Arc<AppState>>, Path(task_id): Path<String>) -> Response {
    match state.tasks.status(&task_id) {
        Ok(view) => ok(view),
        Err(e) => map_task_error(e),
    }
}

pub async fn task_result(State(state): State<Arc<AppState>>, Path(task_id): Path<String>) -> Response {
    match state.tasks.result(&task_id) {
        Ok(result) => ok(result),
        Err(e) => map_task_error(e),
    }
}

pub async fn task_cancel(State(state): State<Arc<AppState>>, Path(task_id): Path<String>) -> Response {
    match state.tasks.cancel(&task_id) {
        Ok(()) => ok(json!({})),
        Err(e) => map_task_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkFailedRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn task_mark_failed(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    Json(req): Json<MarkFailedRequest>,
) -> Response {
    let reason = req.reason.unwrap_or_else(|| "marked failed via API".to_string());
    match state.tasks.mark_failed(&task_id, reason) {
        Ok(()) => ok(json!({})),
        Err(e) => map_task_error(e),
    }
}

pub async fn task_delete(State(state): State<Arc<AppState>>, Path(task_id): Path<String>) -> Response {
    match state.tasks.delete(&task_id) {
        Ok(()) => {
            state.progress.forget(&task_id);
            ok(json!({}))
        }
        Err(e) => map_task_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub symbol: Option<String>,
    pub market: Option<String>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub async fn user_history(State(state): State<Arc<AppState>>, Query(q): Query<HistoryQuery>) -> Response {
    let filter = HistoryFilter {
        user_id: q.user_id,
        status: q.status.as_deref().and_then(TaskStatus::parse),
        symbol: q.symbol,
        market: q.market,
        from: q.from,
        to: q.to,
        page: q.page,
        page_size: q.page_size,
    };
    match state.tasks.history(filter) {
        Ok(page) => ok(page),
        Err(e) => map_task_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ReclaimRequest {
    #[serde(default = "default_max_running_hours")]
    pub max_running_hours: u32,
}

fn default_max_running_hours() -> u32 {
    24
}

pub async fn cleanup_zombie_tasks(State(state): State<Arc<AppState>>, Json(req): Json<ReclaimRequest>) -> Response {
    match state.tasks.reclaim_zombies(req.max_running_hours) {
        Ok(count) => ok(json!({"total_cleaned": count})),
        Err(e) => map_task_error(e),
    }
}

pub async fn get_agent_config(State(state): State<Arc<AppState>>, Path(phase): Path<u8>) -> Response {
    if !(1..=4).contains(&phase) {
        return err(StatusCode::BAD_REQUEST, "phase must be in 1..=4");
    }
    let path = state.agent_config_dir.join(format!("phase{phase}_agents_config.yaml"));
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) if phase == 1 => return ok(json!({"customModes": embedded_custom_modes()})),
        Err(_) => return ok(json!({"customModes": []})),
    };
    match serde_yaml::from_str::<serde_yaml::Value>(&content) {
        Ok(value) => ok(value),
        Err(e) => err(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to parse {}: {e}", path.display())),
    }
}

fn embedded_custom_modes() -> serde_json::Value {
    let records = marketmind_core::AgentRecordStore::embedded();
    let modes: Vec<_> = records
        .records()
        .unwrap_or_default()
        .into_iter()
        .map(|r| {
            json!({
                "slug": r.slug,
                "name": r.name,
                "roleDefinition": r.role_definition,
                "description": r.description,
                "whenToUse": r.when_to_use,
                "groups": r.groups,
                "tools": r.tools,
            })
        })
        .collect();
    json!(modes)
}

pub async fn put_agent_config(
    State(state): State<Arc<AppState>>,
    Path(phase): Path<u8>,
    body: String,
) -> Response {
    if !(1..=4).contains(&phase) {
        return err(StatusCode::BAD_REQUEST, "phase must be in 1..=4");
    }
    let parsed: Result<serde_yaml::Value, _> = serde_yaml::from_str(&body);
    let Ok(value) = parsed else {
        return err(StatusCode::BAD_REQUEST, "body is not valid YAML");
    };
    if value.get("customModes").is_none() {
        return err(StatusCode::BAD_REQUEST, "body must have a top-level customModes key");
    }
    if let Err(e) = std::fs::create_dir_all(&state.agent_config_dir) {
        return err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    let path = state.agent_config_dir.join(format!("phase{phase}_agents_config.yaml"));
    match std::fs::write(&path, &body) {
        Ok(()) => {
            state.records.clear_cache();
            ok(json!({"saved": true}))
        }
        Err(e) => err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn list_mcp_tools(State(state): State<Arc<AppState>>) -> Response {
    let tools = state.mcp_bridge.list_available_tools().await;
    let payload: Vec<_> = tools
        .into_iter()
        .map(|t| {
            json!({
                "id": t.id,
                "name": t.name,
                "description": t.description,
                "server": t.server,
                "status": format!("{:?}", t.status).to_lowercase(),
            })
        })
        .collect();
    ok(json!({"tools": payload}))
}

pub async fn restart_mcp_server(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.mcp_bridge.restart(&name).await {
        Ok(()) => ok(json!({"restarted": name})),
        Err(e) => err(StatusCode::CONFLICT, e),
    }
}
