//! Stage B: the bull/bear investment debate, the research manager that
//! resolves it, and the trader that turns the resolution into an actionable
//! plan.
//!
//! Each side sees the analyst reports plus its own history and the
//! opponent's history, labelled so the model can tell which is which. The
//! debate alternates strictly: bull opens, bear replies, bull rebuts, and so
//! on, for `max_rounds` round-trips. Each utterance is appended under a
//! per-round section title; a re-run of the same round (e.g. after a graph
//! retry) is skipped rather than duplicated.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::{AnalysisState, DebateRound};
use crate::traits::Agent;

fn reports_block(state: &AnalysisState) -> String {
    let mut keys: Vec<&String> = state.reports.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| format!("## {k}\n{}", state.reports[k]))
        .collect::<Vec<_>>()
        .join("\n\n")
}

async fn invoke_debater(
    llm: &dyn LlmClient,
    role_prompt: &str,
    state: &AnalysisState,
    own_history: &str,
    opponent_history: &str,
) -> Result<String, AgentError> {
    let messages = vec![
        Message::system(role_prompt.to_string()),
        Message::user(format!(
            "Analyst reports:\n\n{}\n\n我方历史陈述 (my previous statements):\n{}\n\n对方历史陈述 (opponent statements):\n{}\n\nMake your case now, addressing the opponent's latest point if any.",
            reports_block(state),
            if own_history.is_empty() { "(none yet)" } else { own_history },
            if opponent_history.is_empty() { "(none yet)" } else { opponent_history },
        )),
    ];
    let response = llm.invoke(&messages).await?;
    Ok(response.content)
}

/// 🐂 the bullish side of the investment debate.
pub struct BullResearcherAgent {
    llm: Arc<dyn LlmClient>,
}

impl BullResearcherAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

const BULL_ROLE: &str = "You are the bull researcher. Argue for why this stock is a good investment, using the analyst reports as evidence. Be specific and rebut the bear's points directly when they exist.";
const BEAR_ROLE: &str = "You are the bear researcher. Argue for why this stock is a risky or poor investment, using the analyst reports as evidence. Be specific and rebut the bull's points directly when they exist.";

#[async_trait]
impl Agent for BullResearcherAgent {
    type State = AnalysisState;

    fn name(&self) -> &str {
        "\u{1F402} \u{770B}\u{6DA8}\u{7814}\u{7A76}\u{5458}"
    }

    async fn run(&self, mut state: AnalysisState) -> Result<AnalysisState, AgentError> {
        let statement = invoke_debater(
            self.llm.as_ref(),
            BULL_ROLE,
            &state,
            &state.investment_debate_state.bull_history,
            &state.investment_debate_state.bear_history,
        )
        .await?;

        let debate = &mut state.investment_debate_state;
        let round_index = debate.current_round_index as usize;
        if debate.rounds.len() <= round_index {
            debate.rounds.push(DebateRound::default());
        }
        debate.rounds[round_index].bull = Some(statement.clone());
        debate.bull_report_content = statement.clone();

        let section_title = format!("### Round {round_index} \u{00B7} Bull");
        if !debate.bull_history.contains(&section_title) {
            debate.bull_history.push_str(&format!("\n{section_title}\n{statement}"));
        }
        if !debate.history.contains(&section_title) {
            debate.history.push_str(&format!("\n{section_title}\n[Bull] {statement}"));
        }
        debate.current_response = statement;
        debate.count += 1;
        debate.latest_speaker = Some("bull".to_string());

        Ok(state)
    }
}

/// 🐻 the bearish side of the investment debate.
pub struct BearResearcherAgent {
    llm: Arc<dyn LlmClient>,
}

impl BearResearcherAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Agent for BearResearcherAgent {
    type State = AnalysisState;

    fn name(&self) -> &str {
        "\u{1F43B} \u{770B}\u{8DCC}\u{7814}\u{7A76}\u{5458}"
    }

    async fn run(&self, mut state: AnalysisState) -> Result<AnalysisState, AgentError> {
        let statement = invoke_debater(
            self.llm.as_ref(),
            BEAR_ROLE,
            &state,
            &state.investment_debate_state.bear_history,
            &state.investment_debate_state.bull_history,
        )
        .await?;

        let debate = &mut state.investment_debate_state;
        let round_index = debate.current_round_index as usize;
        if debate.rounds.len() <= round_index {
            debate.rounds.push(DebateRound::default());
        }
        debate.rounds[round_index].bear = Some(statement.clone());
        debate.bear_report_content = statement.clone();

        let section_title = format!("### Round {round_index} \u{00B7} Bear");
        if !debate.bear_history.contains(&section_title) {
            debate.bear_history.push_str(&format!("\n{section_title}\n{statement}"));
        }
        if !debate.history.contains(&section_title) {
            debate.history.push_str(&format!("\n{section_title}\n[Bear] {statement}"));
        }
        debate.current_response = statement;
        debate.count += 1;
        debate.current_round_index += 1;
        debate.latest_speaker = Some("bear".to_string());

        Ok(state)
    }
}

/// 👔 resolves the debate into a single research plan once it terminates.
pub struct ResearchManagerAgent {
    llm: Arc<dyn LlmClient>,
}

impl ResearchManagerAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Agent for ResearchManagerAgent {
    type State = AnalysisState;

    fn name(&self) -> &str {
        "\u{1F454} \u{7814}\u{7A76}\u{7ECF}\u{7406}"
    }

    async fn run(&self, mut state: AnalysisState) -> Result<AnalysisState, AgentError> {
        let messages = vec![
            Message::system(
                "You are the research manager. Read the full bull/bear debate and decide \
                 which side is more convincing, then write a single consolidated investment \
                 plan that a trader can act on."
                    .to_string(),
            ),
            Message::user(format!(
                "Analyst reports:\n\n{}\n\nDebate transcript:\n{}",
                reports_block(&state),
                state.investment_debate_state.history
            )),
        ];
        let response = self.llm.invoke(&messages).await?;
        state.investment_plan = response.content;
        Ok(state)
    }
}

/// 💼 turns the research manager's consolidated view into the trader's
/// actionable plan, consumed by the risk debate and the final summary.
pub struct TraderAgent {
    llm: Arc<dyn LlmClient>,
}

impl TraderAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Agent for TraderAgent {
    type State = AnalysisState;

    fn name(&self) -> &str {
        "\u{1F4BC} \u{4EA4}\u{6613}\u{5458}\u{51B3}\u{7B56}"
    }

    async fn run(&self, mut state: AnalysisState) -> Result<AnalysisState, AgentError> {
        let messages = vec![
            Message::system(
                "You are the trader. Turn the research manager's consolidated investment \
                 plan into a concrete, actionable trade plan: position size, entry \
                 conditions, and exit conditions."
                    .to_string(),
            ),
            Message::user(format!("Investment plan:\n{}", state.investment_plan)),
        ];
        let response = self.llm.invoke(&messages).await?;
        state.trader_investment_plan = response.content;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn reported_state() -> AnalysisState {
        let mut state = AnalysisState::default();
        state.reports.insert("market_report".to_string(), "uptrend".to_string());
        state
    }

    #[tokio::test]
    async fn bull_then_bear_populate_round_zero() {
        let bull = BullResearcherAgent::new(Arc::new(MockLlm::with_no_tool_calls("strong buy")));
        let state = bull.run(reported_state()).await.unwrap();
        assert_eq!(state.investment_debate_state.rounds[0].bull.as_deref(), Some("strong buy"));
        assert_eq!(state.investment_debate_state.count, 1);
        assert_eq!(state.investment_debate_state.current_round_index, 0);

        let bear = BearResearcherAgent::new(Arc::new(MockLlm::with_no_tool_calls("overvalued")));
        let state = bear.run(state).await.unwrap();
        assert_eq!(state.investment_debate_state.rounds[0].bear.as_deref(), Some("overvalued"));
        assert_eq!(state.investment_debate_state.count, 2);
        assert_eq!(state.investment_debate_state.current_round_index, 1);
    }

    #[tokio::test]
    async fn research_manager_writes_investment_plan() {
        let manager = ResearchManagerAgent::new(Arc::new(MockLlm::with_no_tool_calls("go long, tight stop")));
        let mut state = reported_state();
        state.investment_debate_state.history = "[Bull] strong buy\n[Bear] overvalued".to_string();
        let state = manager.run(state).await.unwrap();
        assert_eq!(state.investment_plan, "go long, tight stop");
    }

    #[tokio::test]
    async fn bear_history_accumulates_across_rounds() {
        let bear = BearResearcherAgent::new(Arc::new(MockLlm::with_no_tool_calls("still risky")));
        let mut state = reported_state();
        state.investment_debate_state.bear_history = "\nfirst concern".to_string();
        let state = bear.run(state).await.unwrap();
        assert!(state.investment_debate_state.bear_history.contains("first concern"));
        assert!(state.investment_debate_state.bear_history.contains("still risky"));
    }

    #[tokio::test]
    async fn trader_writes_trader_investment_plan_from_research_plan() {
        let trader = TraderAgent::new(Arc::new(MockLlm::with_no_tool_calls("buy 100 shares, stop at 90")));
        let mut state = reported_state();
        state.investment_plan = "go long, tight stop".to_string();
        let state = trader.run(state).await.unwrap();
        assert_eq!(state.trader_investment_plan, "buy 100 shares, stop at 90");
    }

    #[tokio::test]
    async fn rerunning_bull_for_same_round_does_not_duplicate_section() {
        let bull = BullResearcherAgent::new(Arc::new(MockLlm::with_no_tool_calls("strong buy")));
        let state = bull.run(reported_state()).await.unwrap();
        // Simulate a retry of the same node against the same round (graph retry path):
        // current_round_index is unchanged since bull never advances it itself.
        let mut retried = state.clone();
        retried.investment_debate_state.current_round_index = state.investment_debate_state.current_round_index;
        let state = bull.run(retried).await.unwrap();
        let section_title = "### Round 0 \u{00B7} Bull";
        assert_eq!(state.investment_debate_state.history.matches(section_title).count(), 1);
        assert_eq!(state.investment_debate_state.bull_history.matches(section_title).count(), 1);
    }
}
