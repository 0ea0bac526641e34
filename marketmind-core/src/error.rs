//! Crate-wide agent error type.
//!
//! Returned by `Agent::run`, `Node::run`, and most of the graph execution path.
//! Each variant maps to one of the error kinds produced by the layers above it
//! (LLM client, tool source, checkpoint/store, graph compilation/runtime).

use thiserror::Error;

/// Error produced while running an agent, a graph node, or a compiled graph.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("llm: {0}")]
    Llm(String),

    #[error("tool: {0}")]
    Tool(String),

    #[error("checkpoint: {0}")]
    Checkpoint(String),

    #[error("store: {0}")]
    Store(String),

    #[error("graph: {0}")]
    Graph(String),

    #[error("serialization: {0}")]
    Serialization(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl From<crate::memory::CheckpointError> for AgentError {
    fn from(e: crate::memory::CheckpointError) -> Self {
        AgentError::Checkpoint(e.to_string())
    }
}

impl From<crate::memory::StoreError> for AgentError {
    fn from(e: crate::memory::StoreError) -> Self {
        AgentError::Store(e.to_string())
    }
}

impl From<crate::tool_source::ToolSourceError> for AgentError {
    fn from(e: crate::tool_source::ToolSourceError) -> Self {
        AgentError::Tool(e.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_error_display_contains_kind_prefix() {
        assert!(AgentError::Llm("boom".into()).to_string().starts_with("llm:"));
        assert!(AgentError::Tool("boom".into()).to_string().starts_with("tool:"));
        assert_eq!(AgentError::Cancelled.to_string(), "cancelled");
    }
}
