//! HTTP + WebSocket server for the equity-analysis backend (axum + ws).
//!
//! Wires [`marketmind_core::AgentGraphController`] (the analyst/debate/risk
//! pipeline), [`marketmind_tasks::TaskLifecycleManager`] (task submission,
//! status, cancellation, history), and [`progress::ProgressBroadcaster`]
//! (the `/analysis/ws/task/{id}` progress channel) into one axum app.
//!
//! **Public API**: [`run_serve`], [`run_serve_on_listener`].

mod app;
mod http;
mod progress;
mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use marketmind_core::{
    AgentGraphController, AgentRecordStore, ChatOpenAI, LlmClient, MarketDataTool, McpBridge,
};
use marketmind_providers::{AkShareAdapter, BaoStockAdapter, ProviderAdapter, ProviderOrchestrator, QuoteStore, TushareAdapter};
use marketmind_tasks::{TaskLifecycleManager, TaskStore};

use app::{router, AppState};
use progress::ProgressBroadcaster;

const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";

async fn build_state() -> Arc<AppState> {
    let _ = marketmind_config::load_and_apply("marketmind", None);

    let config_dir = marketmind_config::agent_config_dir();
    let make_records = || {
        if config_dir.is_dir() {
            AgentRecordStore::new(Some(config_dir.clone()))
        } else {
            AgentRecordStore::embedded()
        }
    };
    let records = make_records();
    let controller_records = make_records();

    let llm: Arc<dyn LlmClient> = Arc::new(ChatOpenAI::new(
        std::env::var("MARKETMIND_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
    ));

    let tools = Arc::new(marketmind_core::AggregateToolSource::new());

    let quote_db = std::env::var("QUOTE_DB").unwrap_or_else(|_| "quotes.db".to_string());
    let quote_store = Arc::new(QuoteStore::new(&quote_db).expect("open quote store"));
    let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
        Arc::new(TushareAdapter::new()),
        Arc::new(AkShareAdapter::new()),
        Arc::new(BaoStockAdapter::new()),
    ];
    let orchestrator = Arc::new(ProviderOrchestrator::new(adapters, quote_store, "cn"));
    tools.register_sync(Box::new(MarketDataTool::new(orchestrator)));

    let mcp_config_path = marketmind_config::mcp_servers_config_path();
    let mcp_servers = marketmind_config::load_mcp_servers(mcp_config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load mcp servers config, starting with none");
        vec![]
    });
    let mcp_bridge = Arc::new(McpBridge::initialize_connections(mcp_servers).await);
    mcp_bridge.register_all_into(&tools).await;

    let controller = Arc::new(AgentGraphController::new(controller_records, llm, tools));

    let task_db = std::env::var("TASK_DB").unwrap_or_else(|_| "tasks.db".to_string());
    let store = Arc::new(TaskStore::new(&task_db).expect("open task store"));
    let progress = Arc::new(ProgressBroadcaster::new());

    let runtime_dir = std::env::var("MARKETMIND_RUNTIME_DIR").map(PathBuf::from).ok();
    let mut manager = TaskLifecycleManager::new(store, controller).with_progress_sink(progress.clone());
    if let Some(dir) = runtime_dir {
        manager = manager.with_runtime_dir(dir);
    }

    Arc::new(AppState {
        tasks: manager,
        progress,
        records,
        agent_config_dir: config_dir,
        mcp_bridge,
    })
}

/// Runs the HTTP + WebSocket server on an existing listener (used by tests:
/// bind to `127.0.0.1:0`, then pass the listener in).
pub async fn run_serve_on_listener(listener: TcpListener) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("HTTP + WebSocket server listening on http://{}", addr);
    let state = build_state().await;
    let app = router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Runs the HTTP + WebSocket server. Listens on `addr` (default `127.0.0.1:8080`).
pub async fn run_serve(addr: Option<&str>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = addr.unwrap_or(DEFAULT_HTTP_ADDR);
    let listener = TcpListener::bind(addr).await?;
    run_serve_on_listener(listener).await
}
