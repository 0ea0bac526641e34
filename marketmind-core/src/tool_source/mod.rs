//! # Tool Source
//!
//! A [`ToolSource`] lists and calls tools from one provider. The built-in
//! provider is [`mcp::McpToolSource`], which speaks the MCP protocol over
//! stdio or Streamable HTTP; `tools::AggregateToolSource` fans a single
//! `Tool` interface out across many sources.

mod bridge;
mod context;
mod mcp;

pub use bridge::{AvailableTool, McpBridge, ServerStatus};
pub use context::ToolCallContext;
pub use mcp::{McpHttpSession, McpSession, McpSessionError, McpToolSource};

use async_trait::async_trait;
use serde_json::Value;

/// Description of a callable tool, as returned by `tools/list`.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Text content returned by a `tools/call`. MCP tools may return richer
/// content (images, resources); only the text is surfaced here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCallContent {
    pub text: String,
}

impl ToolCallContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Errors raised listing or calling tools from a source.
#[derive(Debug, thiserror::Error)]
pub enum ToolSourceError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("json-rpc: {0}")]
    JsonRpc(String),
}

/// Something that can list tools and invoke them by name.
#[async_trait]
pub trait ToolSource: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallContent, ToolSourceError>;
}
