//! Tool registry: name-keyed lookup, allow-list/provider filtering, blocking
//! isolation for synchronous tool bodies, and per-tool circuit breakers for
//! MCP-origin tools.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
use crate::tools::Tool;

/// Consecutive failures before a breaker flips from closed to open.
const FAILURE_THRESHOLD: u32 = 3;
/// How long an open breaker stays open before allowing a probe call.
const COOLDOWN: Duration = Duration::from_secs(30);

/// Where a tool's implementation lives. Local tools bypass the circuit
/// breaker entirely; MCP tools are wrapped by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolOrigin {
    Local,
    Mcp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Breaker {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    last_error: Option<String>,
}

impl Default for Breaker {
    fn default() -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            last_error: None,
        }
    }
}

impl Breaker {
    fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let cooled_down = self.opened_at.map(|t| t.elapsed() >= COOLDOWN).unwrap_or(false);
                if cooled_down {
                    self.state = BreakerState::HalfOpen;
                }
                cooled_down
            }
        }
    }

    fn record_success(&mut self) {
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    fn record_failure(&mut self, error: String) {
        self.consecutive_failures += 1;
        self.last_error = Some(error);
        if self.state == BreakerState::HalfOpen || self.consecutive_failures >= FAILURE_THRESHOLD {
            self.state = BreakerState::Open;
            self.opened_at = Some(Instant::now());
        }
    }
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    origin: ToolOrigin,
    /// Name of the provider this tool requires, if any. Filtered out of
    /// `filtered()` when that provider reports unavailable.
    requires_provider: Option<String>,
}

/// Name-keyed tool table. Not thread-safe on its own; wrap in
/// [`ToolRegistryLocked`] for concurrent access.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>, origin: ToolOrigin) {
        self.register_with_provider(tool, origin, None);
    }

    pub fn register_with_provider(
        &mut self,
        tool: Arc<dyn Tool>,
        origin: ToolOrigin,
        requires_provider: Option<String>,
    ) {
        let name = tool.name().to_string();
        self.tools.insert(
            name,
            RegisteredTool {
                tool,
                origin,
                requires_provider,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|rt| rt.tool.clone())
    }

    pub fn origin(&self, name: &str) -> Option<ToolOrigin> {
        self.tools.get(name).map(|rt| rt.origin)
    }

    /// Tools visible to one agent run: start with all tools, narrow by the
    /// agent's allow-list (if non-empty), then drop tools whose required
    /// provider is in `unavailable_providers`.
    pub fn filtered(
        &self,
        allow_list: Option<&[String]>,
        unavailable_providers: &[String],
    ) -> Vec<Arc<dyn Tool>> {
        self.tools
            .values()
            .filter(|rt| match allow_list {
                Some(allowed) if !allowed.is_empty() => {
                    allowed.iter().any(|a| a == rt.tool.name())
                }
                _ => true,
            })
            .filter(|rt| match &rt.requires_provider {
                Some(p) => !unavailable_providers.iter().any(|u| u == p),
                None => true,
            })
            .map(|rt| rt.tool.clone())
            .collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|rt| rt.tool.spec()).collect()
    }
}

/// Thread-safe wrapper around [`ToolRegistry`], with one circuit breaker per
/// tool name. A `ToolRegistryLocked` is scoped to a single task: breaker
/// state does not leak across tasks.
pub struct ToolRegistryLocked {
    registry: RwLock<ToolRegistry>,
    breakers: DashMap<String, Breaker>,
}

impl ToolRegistryLocked {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: RwLock::new(registry),
            breakers: DashMap::new(),
        }
    }

    pub async fn register(&self, tool: Arc<dyn Tool>, origin: ToolOrigin) {
        self.registry.write().await.register(tool, origin);
    }

    /// Registers a tool without an `.await`. For building the startup tool
    /// set before any agent run begins; blocks the current thread briefly
    /// rather than yielding, since nothing else holds the lock yet.
    pub fn register_sync(&self, tool: Arc<dyn Tool>, origin: ToolOrigin) {
        self.registry.blocking_write().register(tool, origin);
    }

    pub async fn list(&self) -> Vec<ToolSpec> {
        self.registry.read().await.specs()
    }

    pub async fn filtered(
        &self,
        allow_list: Option<&[String]>,
        unavailable_providers: &[String],
    ) -> Vec<Arc<dyn Tool>> {
        self.registry.read().await.filtered(allow_list, unavailable_providers)
    }

    /// Calls `name` with `args`, honoring the circuit breaker for MCP-origin
    /// tools. Per the error contract, a tool failure is never propagated as
    /// `Err` here: it comes back as ordinary `ToolCallContent` text so the
    /// caller can feed it straight to the LLM and keep going. `Err` is
    /// reserved for "name not registered", which is a caller bug, not a tool
    /// failure.
    pub async fn call(
        &self,
        name: &str,
        args: Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let (tool, origin) = {
            let guard = self.registry.read().await;
            let tool = guard
                .get(name)
                .ok_or_else(|| ToolSourceError::Transport(format!("tool not registered: {name}")))?;
            let origin = guard.origin(name).unwrap_or(ToolOrigin::Local);
            (tool, origin)
        };

        if origin == ToolOrigin::Mcp {
            let mut breaker = self.breakers.entry(name.to_string()).or_default();
            if !breaker.allow() {
                return Ok(ToolCallContent::new(format!(
                    "\u{274c} tool {name} failed: disabled in this task (circuit open); \
                     please try another tool or record this limitation in the final report."
                )));
            }
        }

        match tool.call(args, ctx).await {
            Ok(result) => {
                if origin == ToolOrigin::Mcp {
                    if let Some(mut breaker) = self.breakers.get_mut(name) {
                        breaker.record_success();
                    }
                }
                Ok(result)
            }
            Err(err) => {
                if origin == ToolOrigin::Mcp {
                    self.breakers
                        .entry(name.to_string())
                        .or_default()
                        .record_failure(err.to_string());
                }
                Ok(ToolCallContent::new(format!(
                    "\u{274c} tool {name} failed: {err}; please try another tool or record this limitation in the final report."
                )))
            }
        }
    }
}

/// Runs a blocking tool body on a fresh OS thread with its own standard
/// (non-cooperative) runtime, then joins the result back in. Some tool
/// backends start their own nested event loop internally and fail when
/// nested directly under the calling task's scheduler; spawning them on an
/// isolated thread sidesteps that.
pub async fn run_isolated<F, T>(f: F) -> Result<T, ToolSourceError>
where
    F: FnOnce() -> Result<T, ToolSourceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ToolSourceError::Transport(format!("isolated task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "echo".into(),
                description: None,
                input_schema: serde_json::json!({}),
            }
        }
        async fn call(
            &self,
            args: Value,
            _ctx: Option<&ToolCallContext>,
        ) -> Result<ToolCallContent, ToolSourceError> {
            Ok(ToolCallContent::new(args.to_string()))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "fails"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "fails".into(),
                description: None,
                input_schema: serde_json::json!({}),
            }
        }
        async fn call(
            &self,
            _args: Value,
            _ctx: Option<&ToolCallContext>,
        ) -> Result<ToolCallContent, ToolSourceError> {
            Err(ToolSourceError::Transport("boom".into()))
        }
    }

    #[test]
    fn filtered_respects_allow_list() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool), ToolOrigin::Local);
        registry.register(Arc::new(FailingTool), ToolOrigin::Local);

        let allowed = vec!["echo".to_string()];
        let tools = registry.filtered(Some(&allowed), &[]);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "echo");
    }

    #[test]
    fn filtered_drops_tools_needing_unavailable_provider() {
        let mut registry = ToolRegistry::new();
        registry.register_with_provider(
            Arc::new(EchoTool),
            ToolOrigin::Local,
            Some("akshare".to_string()),
        );

        let tools = registry.filtered(None, &["akshare".to_string()]);
        assert!(tools.is_empty());
    }

    #[tokio::test]
    async fn call_unknown_tool_errors() {
        let locked = ToolRegistryLocked::new(ToolRegistry::new());
        let err = locked.call("missing", serde_json::json!({}), None).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn call_wraps_failure_as_text_not_err() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool), ToolOrigin::Local);
        let locked = ToolRegistryLocked::new(registry);

        let result = locked.call("fails", serde_json::json!({}), None).await.unwrap();
        assert!(result.text.contains("tool fails failed"));
    }

    #[tokio::test]
    async fn breaker_opens_after_threshold_and_short_circuits() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool), ToolOrigin::Mcp);
        let locked = ToolRegistryLocked::new(registry);

        for _ in 0..FAILURE_THRESHOLD {
            locked.call("fails", serde_json::json!({}), None).await.unwrap();
        }
        let result = locked.call("fails", serde_json::json!({}), None).await.unwrap();
        assert!(result.text.contains("circuit open"));
    }
}
