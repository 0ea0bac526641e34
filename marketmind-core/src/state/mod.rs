//! State types for the agent graph controller.
//!
//! [`AnalysisState`] flows through [`StateGraph`](crate::graph::StateGraph)
//! and is read/written by every node in the analysts -> debate -> risk ->
//! summary pipeline.

pub mod analysis_state;

pub use analysis_state::{
    analysis_state_updater, boxed_analysis_state_updater, AnalysisState, DebateRound,
    FinalSignal, InvestmentDebateState, KeyIndicators, RiskAssessment, RiskDebateState,
    RiskLevel, StructuredSummary, ToolCall, ToolResult,
};
