//! Stage C: the three-way risky/safe/neutral risk debate and the risk judge
//! that closes it out with a final trade decision.
//!
//! Like Stage B, each utterance is appended under a per-round section title
//! so a re-run of the same round doesn't duplicate content in the
//! accumulated transcript.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::AnalysisState;
use crate::traits::Agent;

async fn invoke_risk_voice(
    llm: &dyn LlmClient,
    role_prompt: &str,
    state: &AnalysisState,
) -> Result<String, AgentError> {
    let messages = vec![
        Message::system(role_prompt.to_string()),
        Message::user(format!(
            "Trader's investment plan:\n{}\n\nDebate so far:\n{}\n\nMake your case now.",
            state.trader_investment_plan,
            if state.risk_debate_state.history.is_empty() {
                "(none yet)"
            } else {
                &state.risk_debate_state.history
            }
        )),
    ];
    let response = llm.invoke(&messages).await?;
    Ok(response.content)
}

const RISKY_ROLE: &str = "You are the risky risk analyst. Argue for taking a more aggressive position than the trader's plan, emphasizing upside.";
const SAFE_ROLE: &str = "You are the safe risk analyst. Argue for a more conservative position than the trader's plan, emphasizing capital preservation.";
const NEUTRAL_ROLE: &str = "You are the neutral risk analyst. Weigh both the aggressive and conservative views and argue for a balanced position.";

macro_rules! risk_voice_agent {
    ($struct_name:ident, $role:expr, $history_field:ident, $label:expr, $name:expr) => {
        pub struct $struct_name {
            llm: Arc<dyn LlmClient>,
        }

        impl $struct_name {
            pub fn new(llm: Arc<dyn LlmClient>) -> Self {
                Self { llm }
            }
        }

        #[async_trait]
        impl Agent for $struct_name {
            type State = AnalysisState;

            fn name(&self) -> &str {
                $name
            }

            async fn run(&self, mut state: AnalysisState) -> Result<AnalysisState, AgentError> {
                let statement = invoke_risk_voice(self.llm.as_ref(), $role, &state).await?;
                let debate = &mut state.risk_debate_state;
                let round = debate.count / 3;
                let section_title = format!("### Round {round} \u{00B7} {}", $label);
                if !debate.$history_field.contains(&section_title) {
                    debate.$history_field.push_str(&format!("\n{section_title}\n{statement}"));
                }
                if !debate.history.contains(&section_title) {
                    debate.history.push_str(&format!("\n{section_title}\n[{}] {statement}", $label));
                }
                debate.count += 1;
                debate.latest_speaker = Some($label.to_string());
                Ok(state)
            }
        }
    };
}

risk_voice_agent!(
    RiskyAnalystAgent,
    RISKY_ROLE,
    risky_history,
    "risky",
    "\u{1F525} \u{6FC0}\u{8FDB}\u{98CE}\u{9669}\u{8BC4}\u{4F30}"
);
risk_voice_agent!(
    SafeAnalystAgent,
    SAFE_ROLE,
    safe_history,
    "safe",
    "\u{1F6E1}\u{FE0F} \u{4FDD}\u{5B88}\u{98CE}\u{9669}\u{8BC4}\u{4F30}"
);
risk_voice_agent!(
    NeutralAnalystAgent,
    NEUTRAL_ROLE,
    neutral_history,
    "neutral",
    "\u{2696}\u{FE0F} \u{4E2D}\u{6027}\u{98CE}\u{9669}\u{8BC4}\u{4F30}"
);

/// 🎯 closes the risk debate out with a binding trade decision.
pub struct RiskJudgeAgent {
    llm: Arc<dyn LlmClient>,
}

impl RiskJudgeAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Agent for RiskJudgeAgent {
    type State = AnalysisState;

    fn name(&self) -> &str {
        "\u{1F3AF} \u{98CE}\u{9669}\u{7ECF}\u{7406}"
    }

    async fn run(&self, mut state: AnalysisState) -> Result<AnalysisState, AgentError> {
        let messages = vec![
            Message::system(
                "You are the risk manager. Read the risky/safe/neutral debate and the \
                 trader's plan, then issue a final, binding trade decision: Buy, Sell, or \
                 Hold, with a short justification."
                    .to_string(),
            ),
            Message::user(format!(
                "Trader's plan:\n{}\n\nRisk debate:\n{}",
                state.trader_investment_plan, state.risk_debate_state.history
            )),
        ];
        let response = self.llm.invoke(&messages).await?;
        state.risk_debate_state.judge_decision = Some(response.content.clone());
        state.final_trade_decision = response.content;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn plan_state() -> AnalysisState {
        AnalysisState {
            trader_investment_plan: "buy 100 shares".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn risky_voice_appends_to_own_and_shared_history() {
        let agent = RiskyAnalystAgent::new(Arc::new(MockLlm::with_no_tool_calls("go bigger")));
        let state = agent.run(plan_state()).await.unwrap();
        assert!(state.risk_debate_state.risky_history.contains("go bigger"));
        assert!(state.risk_debate_state.history.contains("[risky]"));
        assert_eq!(state.risk_debate_state.count, 1);
    }

    #[tokio::test]
    async fn judge_writes_final_trade_decision_once() {
        let judge = RiskJudgeAgent::new(Arc::new(MockLlm::with_no_tool_calls("Buy: plan confirmed")));
        let mut state = plan_state();
        state.risk_debate_state.history = "[risky] go bigger\n[safe] scale back".to_string();
        let state = judge.run(state).await.unwrap();
        assert_eq!(state.final_trade_decision, "Buy: plan confirmed");
        assert_eq!(state.risk_debate_state.judge_decision.as_deref(), Some("Buy: plan confirmed"));
    }

    #[tokio::test]
    async fn three_voices_rotate_through_full_state() {
        let mut state = plan_state();
        state = RiskyAnalystAgent::new(Arc::new(MockLlm::with_no_tool_calls("aggressive")))
            .run(state)
            .await
            .unwrap();
        state = SafeAnalystAgent::new(Arc::new(MockLlm::with_no_tool_calls("conservative")))
            .run(state)
            .await
            .unwrap();
        state = NeutralAnalystAgent::new(Arc::new(MockLlm::with_no_tool_calls("balanced")))
            .run(state)
            .await
            .unwrap();
        assert_eq!(state.risk_debate_state.count, 3);
        assert!(state.risk_debate_state.history.contains("[risky]"));
        assert!(state.risk_debate_state.history.contains("[safe]"));
        assert!(state.risk_debate_state.history.contains("[neutral]"));
    }

    #[tokio::test]
    async fn rerunning_risky_for_same_round_does_not_duplicate_section() {
        let agent = RiskyAnalystAgent::new(Arc::new(MockLlm::with_no_tool_calls("go bigger")));
        let state = agent.run(plan_state()).await.unwrap();
        // Simulate a retry of the same node against the same round (graph retry path):
        // count is unchanged from the caller's perspective until the node commits.
        let mut retried = state.clone();
        retried.risk_debate_state.count = 0;
        let state = agent.run(retried).await.unwrap();
        let section_title = "### Round 0 \u{00B7} risky";
        assert_eq!(state.risk_debate_state.history.matches(section_title).count(), 1);
        assert_eq!(state.risk_debate_state.risky_history.matches(section_title).count(), 1);
    }
}
