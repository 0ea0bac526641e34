//! `AnalysisState`: the mutable context threaded through the agent graph
//! controller (analysts -> debate -> risk -> summary).
//!
//! Per-analyst reports are dynamically keyed (`reports: HashMap<String, String>`)
//! rather than one static struct field per analyst slug, since the set of
//! analysts is declarative and can grow without a recompile — a node for a
//! newly added analyst record still needs somewhere to write its report.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::channels::{boxed_updater, BoxedStateUpdater, FieldBasedUpdater};

/// A single tool invocation requested by the LLM during an agent's ReAct loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Result of executing one `ToolCall`. Per the tool error contract, failures
/// show up as ordinary text here (`is_error = true`), never as a thrown error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

/// One round of the bull/bear debate; either side may still be silent.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DebateRound {
    pub bull: Option<String>,
    pub bear: Option<String>,
}

/// Rolling state of the bull vs. bear investment debate (Stage B).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InvestmentDebateState {
    pub rounds: Vec<DebateRound>,
    pub current_round_index: u32,
    pub max_rounds: u32,
    pub bull_report_content: String,
    pub bear_report_content: String,
    /// Flat transcript for display, both sides interleaved.
    pub history: String,
    pub bull_history: String,
    pub bear_history: String,
    pub current_response: String,
    /// Total utterances so far; termination checks `count >= 2 * (max_rounds + 1)`.
    pub count: u32,
    pub latest_speaker: Option<String>,
}

/// Rolling state of the three-way risky/safe/neutral risk debate (Stage C).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RiskDebateState {
    pub risky_history: String,
    pub safe_history: String,
    pub neutral_history: String,
    pub history: String,
    pub latest_speaker: Option<String>,
    /// Total utterances; termination checks `count >= 3 * max_rounds`.
    pub count: u32,
    pub max_rounds: u32,
    pub judge_decision: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct KeyIndicators {
    pub entry_price: Option<f64>,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub support_level: Option<f64>,
    pub resistance_level: Option<f64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// 0..=10.
    pub score: f64,
    pub description: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum FinalSignal {
    Buy,
    Sell,
    Hold,
}

/// Stage D's machine-readable output. Emitted once, at the very end of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StructuredSummary {
    pub key_indicators: KeyIndicators,
    /// 0..=100.
    pub model_confidence: f64,
    pub risk_assessment: RiskAssessment,
    /// Plain text, <= 200 chars.
    pub analysis_summary: String,
    /// Plain text, <= 200 chars.
    pub investment_recommendation: String,
    pub analysis_reference: Vec<String>,
    pub final_signal: FinalSignal,
}

impl StructuredSummary {
    /// Deterministic fallback when the summary agent's JSON fails to parse.
    /// Per the "never throw" policy this is a value, not an error.
    pub fn default_fallback() -> Self {
        Self {
            key_indicators: KeyIndicators::default(),
            model_confidence: 50.0,
            risk_assessment: RiskAssessment {
                level: RiskLevel::Medium,
                score: 5.0,
                description: "summary output failed to parse; default assessment".to_string(),
            },
            analysis_summary: String::new(),
            investment_recommendation: String::new(),
            analysis_reference: Vec::new(),
            final_signal: FinalSignal::Hold,
        }
    }

    /// The "no upstream data" variant: confidence pinned to zero, never a
    /// fabricated number.
    pub fn data_unavailable() -> Self {
        Self {
            key_indicators: KeyIndicators::default(),
            model_confidence: 0.0,
            risk_assessment: RiskAssessment {
                level: RiskLevel::Medium,
                score: 0.0,
                description: "data unavailable".to_string(),
            },
            analysis_summary: "data unavailable".to_string(),
            investment_recommendation: String::new(),
            analysis_reference: Vec::new(),
            final_signal: FinalSignal::Hold,
        }
    }
}

/// The per-task working state passed through every node of the graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnalysisState {
    pub symbol: String,
    pub company_name: String,
    pub trade_date: String,
    pub currency: String,

    /// Keyed by `<internal_key>_report`. One entry per analyst that has
    /// completed; the canonical home for analyst output (see module docs).
    pub reports: HashMap<String, String>,

    pub investment_debate_state: InvestmentDebateState,
    pub risk_debate_state: RiskDebateState,

    /// Consolidated research view produced by the research-manager node.
    pub investment_plan: String,
    pub trader_investment_plan: String,
    /// Written exactly once, by the risk judge node.
    pub final_trade_decision: String,

    pub structured_summary: Option<StructuredSummary>,

    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,

    pub last_error: Option<String>,
}

/// Builds the custom merge logic for `AnalysisState`: scalar fields are
/// last-writer-wins, `reports` is a document merge (first write per key
/// wins, so no stage overwrites another's report), round counters never
/// decrease, and `final_trade_decision` is write-once.
pub fn analysis_state_updater() -> FieldBasedUpdater<AnalysisState, impl Fn(&mut AnalysisState, &AnalysisState) + Send + Sync + 'static>
{
    FieldBasedUpdater::new(|current: &mut AnalysisState, update: &AnalysisState| {
        if !update.symbol.is_empty() {
            current.symbol = update.symbol.clone();
        }
        if !update.company_name.is_empty() {
            current.company_name = update.company_name.clone();
        }
        if !update.trade_date.is_empty() {
            current.trade_date = update.trade_date.clone();
        }
        if !update.currency.is_empty() {
            current.currency = update.currency.clone();
        }

        for (key, value) in &update.reports {
            current.reports.entry(key.clone()).or_insert_with(|| value.clone());
        }

        if update.investment_debate_state.count >= current.investment_debate_state.count {
            current.investment_debate_state = update.investment_debate_state.clone();
        }
        if update.risk_debate_state.count >= current.risk_debate_state.count {
            current.risk_debate_state = update.risk_debate_state.clone();
        }

        if !update.investment_plan.is_empty() {
            current.investment_plan = update.investment_plan.clone();
        }
        if !update.trader_investment_plan.is_empty() {
            current.trader_investment_plan = update.trader_investment_plan.clone();
        }
        if current.final_trade_decision.is_empty() && !update.final_trade_decision.is_empty() {
            current.final_trade_decision = update.final_trade_decision.clone();
        }

        if update.structured_summary.is_some() {
            current.structured_summary = update.structured_summary.clone();
        }
        if !update.tool_calls.is_empty() {
            current.tool_calls = update.tool_calls.clone();
        }
        if !update.tool_results.is_empty() {
            current.tool_results = update.tool_results.clone();
        }
        if update.last_error.is_some() {
            current.last_error = update.last_error.clone();
        }
    })
}

pub fn boxed_analysis_state_updater() -> BoxedStateUpdater<AnalysisState> {
    boxed_updater(analysis_state_updater())
}
