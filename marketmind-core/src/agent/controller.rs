//! The agent graph controller: wires analyst nodes (Stage A, one per enabled
//! [`AgentRecord`]), the investment debate (Stage B), the risk debate
//! (Stage C), and the structured summary (Stage D) into a single
//! [`StateGraph`], and runs it.
//!
//! State-flow invariant 5 (a mid-run failure still yields a partial,
//! best-effort [`StructuredSummary`] rather than an error with no usable
//! output) is implemented in [`AgentGraphController::run_analysis`]: if
//! `CompiledStateGraph::invoke` returns an error, the controller records it
//! on `last_error` and runs the summary node directly against whatever state
//! survived.

use std::sync::Arc;

use crate::agent::debate::{BearResearcherAgent, BullResearcherAgent, ResearchManagerAgent, TraderAgent};
use crate::agent::generic::GenericAgent;
use crate::agent::risk::{NeutralAnalystAgent, RiskJudgeAgent, RiskyAnalystAgent, SafeAnalystAgent};
use crate::agent::routing::{
    investment_debate_router, risk_debate_router, BEAR_NODE, BULL_NODE, NEUTRAL_NODE,
    RESEARCH_MANAGER_NODE, RISKY_NODE, RISK_JUDGE_NODE, SAFE_NODE, TRADER_NODE,
};
use crate::agent::summary::StructuredSummaryAgent;
use crate::error::AgentError;
use crate::graph::{NodeMiddleware, StateGraph, END, START};
use crate::llm::LlmClient;
use crate::memory::RunnableConfig;
use crate::records::AgentRecordStore;
use crate::state::{boxed_analysis_state_updater, AnalysisState};
use crate::traits::Agent;
use crate::tools::AggregateToolSource;

const SUMMARY_NODE: &str = "\u{1F4CA} \u{751F}\u{6210}\u{62A5}\u{544A}";

/// Assembles and runs the full analyst -> debate -> risk -> summary graph for
/// one set of enabled analyst slugs.
pub struct AgentGraphController {
    records: AgentRecordStore,
    llm: Arc<dyn LlmClient>,
    tools: Arc<AggregateToolSource>,
    unavailable_providers: Vec<String>,
    investment_max_rounds: u32,
    risk_max_rounds: u32,
}

impl AgentGraphController {
    pub fn new(records: AgentRecordStore, llm: Arc<dyn LlmClient>, tools: Arc<AggregateToolSource>) -> Self {
        Self {
            records,
            llm,
            tools,
            unavailable_providers: Vec::new(),
            investment_max_rounds: 1,
            risk_max_rounds: 1,
        }
    }

    /// The declarative analyst record store backing this controller, e.g. to
    /// resolve a progress percent map for a set of enabled slugs.
    pub fn records(&self) -> &AgentRecordStore {
        &self.records
    }

    pub fn with_unavailable_providers(mut self, providers: Vec<String>) -> Self {
        self.unavailable_providers = providers;
        self
    }

    pub fn with_investment_max_rounds(mut self, rounds: u32) -> Self {
        self.investment_max_rounds = rounds;
        self
    }

    pub fn with_risk_max_rounds(mut self, rounds: u32) -> Self {
        self.risk_max_rounds = rounds;
        self
    }

    fn build_graph(
        &self,
        enabled_slugs: &[String],
        middleware: Option<Arc<dyn NodeMiddleware<AnalysisState>>>,
    ) -> Result<StateGraph<AnalysisState>, AgentError> {
        let all_records = self
            .records
            .records()
            .map_err(|e| AgentError::Other(e.to_string()))?;
        let selected: Vec<_> = if enabled_slugs.is_empty() {
            all_records
        } else {
            all_records
                .into_iter()
                .filter(|r| enabled_slugs.iter().any(|s| s == &r.slug))
                .collect()
        };
        if selected.is_empty() {
            return Err(AgentError::InvalidState("no analyst records enabled".to_string()));
        }

        let mut graph: StateGraph<AnalysisState> =
            StateGraph::new().with_state_updater(boxed_analysis_state_updater());
        if let Some(m) = middleware {
            graph = graph.with_middleware(m);
        }

        let analyst_ids: Vec<String> = selected.iter().map(|r| r.node_label.clone()).collect();
        for record in &selected {
            let agent = GenericAgent::new(
                record.clone(),
                self.llm.clone(),
                self.tools.clone(),
                self.unavailable_providers.clone(),
            );
            graph.add_node(record.node_label.clone(), Arc::new(agent));
        }
        for pair in analyst_ids.windows(2) {
            graph.add_edge(pair[0].clone(), pair[1].clone());
        }
        graph.add_edge(START, analyst_ids[0].clone());

        graph.add_node(BULL_NODE, Arc::new(BullResearcherAgent::new(self.llm.clone())));
        graph.add_node(BEAR_NODE, Arc::new(BearResearcherAgent::new(self.llm.clone())));
        graph.add_node(
            RESEARCH_MANAGER_NODE,
            Arc::new(ResearchManagerAgent::new(self.llm.clone())),
        );
        graph.add_node(TRADER_NODE, Arc::new(TraderAgent::new(self.llm.clone())));
        graph.add_edge(analyst_ids.last().unwrap().clone(), BULL_NODE);
        graph.add_conditional_edges(BULL_NODE, investment_debate_router().path, None);
        graph.add_conditional_edges(BEAR_NODE, investment_debate_router().path, None);
        graph.add_edge(RESEARCH_MANAGER_NODE, TRADER_NODE);

        graph.add_node(RISKY_NODE, Arc::new(RiskyAnalystAgent::new(self.llm.clone())));
        graph.add_node(SAFE_NODE, Arc::new(SafeAnalystAgent::new(self.llm.clone())));
        graph.add_node(NEUTRAL_NODE, Arc::new(NeutralAnalystAgent::new(self.llm.clone())));
        graph.add_node(RISK_JUDGE_NODE, Arc::new(RiskJudgeAgent::new(self.llm.clone())));
        graph.add_edge(TRADER_NODE, RISKY_NODE);
        graph.add_conditional_edges(RISKY_NODE, risk_debate_router().path, None);
        graph.add_conditional_edges(SAFE_NODE, risk_debate_router().path, None);
        graph.add_conditional_edges(NEUTRAL_NODE, risk_debate_router().path, None);

        graph.add_node(SUMMARY_NODE, Arc::new(StructuredSummaryAgent::new(self.llm.clone())));
        graph.add_edge(RISK_JUDGE_NODE, SUMMARY_NODE);
        graph.add_edge(SUMMARY_NODE, END);

        Ok(graph)
    }

    /// Runs the full graph for `initial_state`. On success the state carries
    /// a `structured_summary`. On a mid-run node failure the error is
    /// recorded on `last_error` and the summary node still runs against the
    /// partial state, so the caller always gets a usable `StructuredSummary`.
    pub async fn run_analysis(
        &self,
        initial_state: AnalysisState,
        enabled_slugs: &[String],
        thread_id: impl Into<String>,
    ) -> Result<AnalysisState, AgentError> {
        self.run_analysis_with_middleware(initial_state, enabled_slugs, thread_id, None)
            .await
    }

    /// Same as [`Self::run_analysis`], but attaches `middleware` (e.g. a
    /// push-based progress reporter) to every node in the compiled graph.
    pub async fn run_analysis_with_middleware(
        &self,
        initial_state: AnalysisState,
        enabled_slugs: &[String],
        thread_id: impl Into<String>,
        middleware: Option<Arc<dyn NodeMiddleware<AnalysisState>>>,
    ) -> Result<AnalysisState, AgentError> {
        let investment_rounds = self.investment_max_rounds;
        let risk_rounds = self.risk_max_rounds;
        let mut seeded = initial_state;
        seeded.investment_debate_state.max_rounds = investment_rounds;
        seeded.risk_debate_state.max_rounds = risk_rounds;

        let graph = self.build_graph(enabled_slugs, middleware)?;
        let compiled = graph
            .compile()
            .map_err(|e| AgentError::Graph(e.to_string()))?;
        let config = RunnableConfig::new(thread_id.into());

        match compiled.invoke(seeded.clone(), &config).await {
            Ok(final_state) => Ok(final_state),
            Err(e) => {
                let mut partial = seeded;
                partial.last_error = Some(e.to_string());
                let summary_agent = StructuredSummaryAgent::new(self.llm.clone());
                Agent::run(&summary_agent, partial).await
            }
        }
    }
}
