//! Fans a single `ToolSource` interface out across every registered tool.
//!
//! Wraps a `ToolRegistryLocked` and implements `ToolSource` by delegating to
//! it. `register_sync` builds the local tool set up front (memory tools,
//! etc.); `register_async` is for tools discovered via an async call, i.e.
//! `register_mcp_tools` after an MCP `tools/list`. MCP-origin tools get
//! circuit-broken by the underlying registry; tools added via `register_sync`
//! do not.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSource, ToolSourceError, ToolSpec};
use crate::tools::registry::{ToolOrigin, ToolRegistry, ToolRegistryLocked};
use crate::tools::Tool;

pub struct AggregateToolSource {
    registry: ToolRegistryLocked,
}

impl AggregateToolSource {
    pub fn new() -> Self {
        Self {
            registry: ToolRegistryLocked::new(ToolRegistry::new()),
        }
    }

    /// Registers a locally-implemented tool before any agent run begins.
    pub fn register_sync(&self, tool: Box<dyn Tool>) {
        self.registry.register_sync(Arc::from(tool), ToolOrigin::Local);
    }

    /// Registers a tool discovered from an async source (MCP `tools/list`).
    pub async fn register_async(&self, tool: Box<dyn Tool>) {
        self.registry.register(Arc::from(tool), ToolOrigin::Mcp).await;
    }

    /// Tools visible to one agent run, per the allow-list/provider-availability
    /// filtering rules.
    pub async fn filtered(
        &self,
        allow_list: Option<&[String]>,
        unavailable_providers: &[String],
    ) -> Vec<Arc<dyn Tool>> {
        self.registry.filtered(allow_list, unavailable_providers).await
    }

    /// Calls a tool with a per-call context (recent messages, stream writer).
    pub async fn call_with_context(
        &self,
        name: &str,
        arguments: Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        self.registry.call(name, arguments, ctx).await
    }
}

impl Default for AggregateToolSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolSource for AggregateToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.registry.list().await)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallContent, ToolSourceError> {
        self.registry.call(name, arguments, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[tokio::test]
    async fn register_sync_then_call_through_tool_source() {
        let aggregate = AggregateToolSource::new();
        aggregate.register_sync(Box::new(EchoTool));

        let specs = aggregate.list_tools().await.unwrap();
        assert_eq!(specs.len(), 1);

        let result = aggregate
            .call_tool("echo", serde_json::json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(result.text, "{\"a\":1}");
    }
}
