//! # marketmind-core
//!
//! The agent graph controller and its supporting runtime for multi-agent
//! equity analysis: analyst nodes (Stage A) feed a bull/bear investment
//! debate (Stage B), which feeds a risky/safe/neutral risk debate
//! (Stage C), which closes out in a single structured summary (Stage D).
//!
//! ## Design principles
//!
//! - **Single state type**: [`AnalysisState`] flows through every node in
//!   the pipeline; nodes read and write fields of it, never a separate
//!   input/output type.
//! - **One step per run**: each [`Agent`] implements a single step — receive
//!   state, return updated state.
//! - **State graphs**: [`StateGraph`] composes nodes with conditional edges
//!   for the debate/rotation logic in Stages B and C.
//! - **Declarative analysts**: the set of Stage-A nodes is not hardcoded; it
//!   is derived at runtime from [`records::AgentRecordStore`].
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`Next`].
//! - [`agent`]: [`AgentGraphController`] and the Stage A-D node implementations.
//! - [`state`]: [`AnalysisState`] and the types nested within it.
//! - [`records`]: [`records::AgentRecordStore`] — declarative analyst records.
//! - [`llm`]: [`LlmClient`] trait, [`MockLlm`], [`ChatOpenAI`].
//! - [`memory`]: checkpointing ([`Checkpointer`], [`MemorySaver`], [`SqliteSaver`]) and [`Store`].
//! - [`tool_source`]: [`ToolSource`] trait; MCP client ([`tool_source::McpToolSource`]).
//! - [`tools`]: [`tools::AggregateToolSource`], the circuit-breaking [`tools::ToolRegistry`].
//! - [`traits`]: core [`Agent`] trait — implement for custom nodes.
//! - [`message`]: [`Message`] (System / User / Assistant).
//! - [`stream`]: [`StreamWriter`], [`StreamEvent`], [`StreamMode`] for progress streaming.
//! - [`config`]: config summaries ([`RunConfigSummary`], [`build_config_summary`]).
//! - [`channels`]: [`StateUpdater`], [`FieldBasedUpdater`] — state-merge strategies.
//! - [`managed`]: [`ManagedValue`], [`IsLastStep`].
//!
//! Key types are re-exported at crate root.

pub mod agent;
pub mod channels;
pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod managed;
pub mod memory;
pub mod message;
pub mod records;
pub mod state;
pub mod stream;
pub mod tool_source;
pub mod tools;
pub mod traits;

pub use agent::AgentGraphController;
pub use channels::{
    boxed_updater, BoxedStateUpdater, FieldBasedUpdater, ReplaceUpdater, StateUpdater,
};
pub use config::{
    build_config_summary, ConfigSection, EmbeddingConfigSummary, LlmConfigSummary,
    MemoryConfigSummary, RunConfigSummary, RunConfigSummarySource, ToolConfigSummary,
};
pub use error::AgentError;
pub use graph::{
    generate_dot, generate_text, log_graph_complete, log_graph_error, log_graph_start,
    log_node_complete, log_node_start, log_state_update, CompilationError, CompiledStateGraph,
    ConditionalRouter, ConditionalRouterFn, DefaultInterruptHandler, GraphInterrupt, Interrupt,
    InterruptHandler, LoggingNodeMiddleware, NameNode, Next, Node, NodeMiddleware, RetryPolicy,
    RunContext, Runtime, StateGraph, END, START,
};
pub use llm::{ChatOpenAI, LlmClient, LlmResponse, LlmUsage, MockLlm, ToolChoiceMode};
pub use managed::{IsLastStep, ManagedValue};
pub use memory::{
    Checkpoint, CheckpointError, CheckpointListItem, CheckpointMetadata, CheckpointSource,
    Checkpointer, InMemoryStore, JsonSerializer, MemorySaver, Namespace, RunnableConfig, Store,
    StoreError, StoreSearchHit,
};
pub use memory::{SqliteSaver, SqliteStore};
pub use message::Message;
pub use records::{AgentRecord, AgentRecordStore};
pub use state::{
    analysis_state_updater, boxed_analysis_state_updater, AnalysisState, DebateRound,
    FinalSignal, InvestmentDebateState, KeyIndicators, RiskAssessment, RiskDebateState,
    RiskLevel, StructuredSummary, ToolCall, ToolResult,
};
pub use stream::{
    CheckpointEvent, MessageChunk, StreamEvent, StreamMetadata, StreamMode, StreamWriter,
    ToolStreamWriter,
};
pub use tool_source::{
    AvailableTool, McpBridge, McpToolSource, ServerStatus, ToolCallContent, ToolCallContext,
    ToolSource, ToolSourceError, ToolSpec,
};
pub use tools::{register_mcp_tools, AggregateToolSource, MarketDataTool, McpToolAdapter, Tool, ToolRegistry};
pub use traits::Agent;

/// When running `cargo test -p marketmind-core`, initializes tracing from
/// `RUST_LOG` so unit tests can print logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
