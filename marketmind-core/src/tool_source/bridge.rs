//! Application-scoped MCP server lifecycle.
//!
//! [`McpToolSource`] is one session, one server. [`McpBridge`] owns every
//! server declared in the MCP servers config file for the lifetime of the
//! process: it dials each at startup, tracks health, and exposes a manual
//! restart/reload surface. Automatic restart is intentionally not performed —
//! a wedged server should surface as `unreachable`, not retry silently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::warn;

use marketmind_config::McpServerConfig;

use crate::tool_source::{McpToolSource, ToolSource};
use crate::tools::{register_mcp_tools, AggregateToolSource};

const RESTART_BUDGET: usize = 3;
const RESTART_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerStatus {
    Healthy,
    Unreachable,
    Stopped,
    Unknown,
}

/// One server's config plus live session (if connected) and health bookkeeping.
struct ServerEntry {
    config: McpServerConfig,
    session: Option<Arc<McpToolSource>>,
    status: ServerStatus,
    last_error: Option<String>,
    restart_attempts: Vec<Instant>,
}

/// A tool as seen through `list_available_tools`, regardless of which server
/// it came from.
#[derive(Clone, Debug)]
pub struct AvailableTool {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub server: String,
    pub status: ServerStatus,
}

pub struct McpBridge {
    servers: Mutex<HashMap<String, ServerEntry>>,
}

impl McpBridge {
    /// Dials every enabled server in `configs`. Servers that fail to connect
    /// are kept in the map as `Unreachable` so `list_available_tools` and
    /// `restart` can still see them.
    pub async fn initialize_connections(configs: Vec<McpServerConfig>) -> Self {
        let bridge = Self { servers: Mutex::new(HashMap::new()) };
        let mut guard = bridge.servers.lock().await;
        for config in configs {
            let entry = connect(config).await;
            guard.insert(entry.config.name.clone(), entry);
        }
        drop(guard);
        bridge
    }

    /// Periodic health check: pings every connected server with `tools/list`
    /// and updates its status. Does not restart anything.
    pub async fn health_check(&self) {
        let mut guard = self.servers.lock().await;
        for entry in guard.values_mut() {
            if !entry.config.enabled {
                entry.status = ServerStatus::Stopped;
                continue;
            }
            let Some(session) = entry.session.as_ref() else {
                entry.status = ServerStatus::Stopped;
                continue;
            };
            match session.list_tools().await {
                Ok(_) => entry.status = ServerStatus::Healthy,
                Err(e) => {
                    warn!(server = %entry.config.name, error = %e, "mcp health check failed");
                    entry.status = ServerStatus::Unreachable;
                    entry.last_error = Some(e.to_string());
                }
            }
        }
    }

    /// Manually restarts one server. Refuses if the server has already
    /// restarted `RESTART_BUDGET` times within `RESTART_WINDOW`.
    pub async fn restart(&self, name: &str) -> Result<(), String> {
        let mut guard = self.servers.lock().await;
        let entry = guard.get_mut(name).ok_or_else(|| format!("unknown mcp server: {name}"))?;

        let cutoff = Instant::now() - RESTART_WINDOW;
        entry.restart_attempts.retain(|t| *t >= cutoff);
        if entry.restart_attempts.len() >= RESTART_BUDGET {
            return Err(format!("restart budget exhausted for {name}"));
        }
        entry.restart_attempts.push(Instant::now());

        let config = entry.config.clone();
        let fresh = connect(config).await;
        *entry = ServerEntry { restart_attempts: std::mem::take(&mut entry.restart_attempts), ..fresh };
        Ok(())
    }

    /// Enables or disables one server, connecting or dropping its session.
    /// Serializes against `reload_config` via the same map lock.
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), String> {
        let mut guard = self.servers.lock().await;
        let entry = guard.get_mut(name).ok_or_else(|| format!("unknown mcp server: {name}"))?;
        entry.config.enabled = enabled;
        if enabled {
            let config = entry.config.clone();
            let fresh = connect(config).await;
            *entry = fresh;
        } else {
            entry.session = None;
            entry.status = ServerStatus::Stopped;
        }
        Ok(())
    }

    /// Tears down every client, clears cached state, and re-dials from
    /// `configs`. Holds the map lock for the whole operation so a concurrent
    /// `restart`/`set_enabled` cannot observe torn state.
    pub async fn reload_config(&self, configs: Vec<McpServerConfig>) {
        let mut guard = self.servers.lock().await;
        guard.clear();
        for config in configs {
            let entry = connect(config).await;
            guard.insert(entry.config.name.clone(), entry);
        }
    }

    /// Unions tools across every connected server, deduped by `{server}:{name}`.
    pub async fn list_available_tools(&self) -> Vec<AvailableTool> {
        let guard = self.servers.lock().await;
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for entry in guard.values() {
            let Some(session) = entry.session.as_ref() else { continue };
            let Ok(specs) = session.list_tools().await else { continue };
            for spec in specs {
                let id = format!("{}:{}", entry.config.name, spec.name);
                if !seen.insert(id.clone()) {
                    continue;
                }
                out.push(AvailableTool {
                    id,
                    name: spec.name,
                    description: spec.description,
                    server: entry.config.name.clone(),
                    status: entry.status,
                });
            }
        }
        out
    }

    /// Registers every connected server's tools into `aggregate` as
    /// `McpToolAdapter`s (one call per server, per `register_mcp_tools`).
    /// Servers that failed to connect are skipped silently; call
    /// `list_available_tools` to see them.
    pub async fn register_all_into(&self, aggregate: &AggregateToolSource) {
        let sessions: Vec<Arc<McpToolSource>> = {
            let guard = self.servers.lock().await;
            guard.values().filter_map(|e| e.session.clone()).collect()
        };
        for session in sessions {
            if let Err(e) = register_mcp_tools(aggregate, session).await {
                warn!(error = %e, "failed to register mcp server tools");
            }
        }
    }

    /// Status of one server, or `None` if it isn't configured.
    pub async fn status(&self, name: &str) -> Option<ServerStatus> {
        self.servers.lock().await.get(name).map(|e| e.status)
    }

    /// Error from the last connect/health-check attempt, if any.
    pub async fn last_error(&self, name: &str) -> Option<String> {
        self.servers.lock().await.get(name).and_then(|e| e.last_error.clone())
    }

    /// Drops every live session. Child processes are terminated by the
    /// underlying session's `Drop` impl; there is no separate at-exit hook.
    pub async fn shutdown(&self) {
        let mut guard = self.servers.lock().await;
        for entry in guard.values_mut() {
            entry.session = None;
            entry.status = ServerStatus::Stopped;
        }
    }
}

async fn connect(config: McpServerConfig) -> ServerEntry {
    if !config.enabled {
        return ServerEntry {
            config,
            session: None,
            status: ServerStatus::Stopped,
            last_error: None,
            restart_attempts: Vec::new(),
        };
    }

    let is_http = config.url.as_deref().map(|u| u.starts_with("http://") || u.starts_with("https://")).unwrap_or(false);

    let session = if is_http {
        let url = config.url.clone().unwrap();
        let headers: Vec<(String, String)> = config.headers.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        McpToolSource::new_http(url, headers).await.map_err(|e| e.to_string())
    } else if let Some(command) = config.command.clone() {
        let env: Vec<(String, String)> = config.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        McpToolSource::new_with_env(command, config.args.clone(), env, false).map_err(|e| e.to_string())
    } else {
        Err(format!("mcp server {} has neither command nor url", config.name))
    };

    match session {
        Ok(session) => ServerEntry {
            config,
            session: Some(Arc::new(session)),
            status: ServerStatus::Healthy,
            last_error: None,
            restart_attempts: Vec::new(),
        },
        Err(e) => {
            warn!(server = %config.name, error = %e, "failed to connect mcp server");
            ServerEntry {
                config,
                session: None,
                status: ServerStatus::Unreachable,
                last_error: Some(e),
                restart_attempts: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stdio_config(name: &str, enabled: bool) -> McpServerConfig {
        McpServerConfig {
            name: name.to_string(),
            command: Some("definitely-not-a-real-binary-xyz".to_string()),
            args: vec![],
            env: HashMap::new(),
            url: None,
            transport: None,
            enabled,
            headers: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn disabled_server_stays_stopped_and_not_dialed() {
        let bridge = McpBridge::initialize_connections(vec![stdio_config("disabled", false)]).await;
        assert_eq!(bridge.status("disabled").await, Some(ServerStatus::Stopped));
        assert!(bridge.list_available_tools().await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_tracked_not_dropped() {
        let bridge = McpBridge::initialize_connections(vec![stdio_config("bad", true)]).await;
        assert_eq!(bridge.status("bad").await, Some(ServerStatus::Unreachable));
    }

    #[tokio::test]
    async fn restart_budget_exhausts_after_three_attempts() {
        let bridge = McpBridge::initialize_connections(vec![stdio_config("bad", true)]).await;
        for _ in 0..RESTART_BUDGET {
            let _ = bridge.restart("bad").await;
        }
        let result = bridge.restart("bad").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("restart budget exhausted"));
    }

    #[tokio::test]
    async fn restart_unknown_server_errors() {
        let bridge = McpBridge::initialize_connections(vec![]).await;
        assert!(bridge.restart("ghost").await.is_err());
    }

    #[tokio::test]
    async fn reload_config_replaces_server_set() {
        let bridge = McpBridge::initialize_connections(vec![stdio_config("a", false)]).await;
        assert!(bridge.status("a").await.is_some());
        bridge.reload_config(vec![stdio_config("b", false)]).await;
        assert!(bridge.status("a").await.is_none());
        assert!(bridge.status("b").await.is_some());
    }
}
