//! Stage D: the structured summary node. Produces the single machine-readable
//! [`StructuredSummary`] emitted at the very end of a run, with deterministic
//! fallbacks so this stage never fails a run outright.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::{AnalysisState, StructuredSummary};
use crate::traits::Agent;

/// Marker substrings that indicate an upstream report genuinely has no data,
/// as opposed to the LLM simply being terse.
const DATA_UNAVAILABLE_MARKERS: &[&str] = &["data unavailable", "no data available", "fetch failed"];

fn any_report_unavailable(state: &AnalysisState) -> bool {
    state.reports.values().any(|report| {
        let lower = report.to_lowercase();
        DATA_UNAVAILABLE_MARKERS.iter().any(|m| lower.contains(m))
    })
}

/// 📊 the final node in the graph: always produces a [`StructuredSummary`],
/// even when the upstream stages partially failed.
pub struct StructuredSummaryAgent {
    llm: Arc<dyn LlmClient>,
}

impl StructuredSummaryAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn prompt(&self, state: &AnalysisState) -> Vec<Message> {
        vec![
            Message::system(
                "You are the summary agent. Read the final trade decision and risk debate \
                 and respond with ONLY a JSON object matching this shape: \
                 {\"key_indicators\": {\"entry_price\": number|null, \"target_price\": number|null, \
                 \"stop_loss\": number|null, \"support_level\": number|null, \"resistance_level\": number|null}, \
                 \"model_confidence\": number 0-100, \
                 \"risk_assessment\": {\"level\": \"High\"|\"Medium\"|\"Low\", \"score\": number 0-10, \"description\": string}, \
                 \"analysis_summary\": string (<=200 chars), \
                 \"investment_recommendation\": string (<=200 chars), \
                 \"analysis_reference\": [string], \
                 \"final_signal\": \"Buy\"|\"Sell\"|\"Hold\"}. \
                 No prose outside the JSON object."
                    .to_string(),
            ),
            Message::user(format!(
                "Final trade decision:\n{}\n\nRisk debate:\n{}",
                state.final_trade_decision, state.risk_debate_state.history
            )),
        ]
    }
}

#[async_trait]
impl Agent for StructuredSummaryAgent {
    type State = AnalysisState;

    fn name(&self) -> &str {
        "\u{1F4CA} \u{751F}\u{6210}\u{62A5}\u{544A}"
    }

    async fn run(&self, mut state: AnalysisState) -> Result<AnalysisState, AgentError> {
        if any_report_unavailable(&state) {
            state.structured_summary = Some(StructuredSummary::data_unavailable());
            return Ok(state);
        }

        let response = match self.llm.invoke(&self.prompt(&state)).await {
            Ok(r) => r,
            Err(_) => {
                state.structured_summary = Some(StructuredSummary::default_fallback());
                return Ok(state);
            }
        };

        let parsed = strip_code_fence(&response.content)
            .and_then(|json| serde_json::from_str::<StructuredSummary>(json).ok());

        state.structured_summary = Some(parsed.unwrap_or_else(StructuredSummary::default_fallback));
        Ok(state)
    }
}

/// Models occasionally wrap JSON in a ```json fence despite instructions; strip
/// it before parsing rather than failing and falling back unnecessarily.
fn strip_code_fence(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    if let Some(inner) = trimmed.strip_prefix("```json") {
        return inner.trim().strip_suffix("```").map(str::trim).or(Some(inner.trim()));
    }
    if let Some(inner) = trimmed.strip_prefix("```") {
        return inner.trim().strip_suffix("```").map(str::trim).or(Some(inner.trim()));
    }
    Some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn valid_json() -> &'static str {
        r#"{"key_indicators": {"entry_price": 1680.0, "target_price": 1800.0, "stop_loss": 1600.0, "support_level": 1650.0, "resistance_level": 1750.0}, "model_confidence": 72.5, "risk_assessment": {"level": "Medium", "score": 5.5, "description": "moderate risk"}, "analysis_summary": "bullish overall", "investment_recommendation": "accumulate on dips", "analysis_reference": ["market_report"], "final_signal": "Buy"}"#
    }

    #[tokio::test]
    async fn parses_valid_json_into_structured_summary() {
        let agent = StructuredSummaryAgent::new(Arc::new(MockLlm::with_no_tool_calls(valid_json())));
        let state = agent.run(AnalysisState::default()).await.unwrap();
        let summary = state.structured_summary.unwrap();
        assert_eq!(summary.model_confidence, 72.5);
        assert!(matches!(summary.final_signal, crate::state::FinalSignal::Buy));
    }

    #[tokio::test]
    async fn strips_markdown_code_fence_before_parsing() {
        let fenced = format!("```json\n{}\n```", valid_json());
        let agent = StructuredSummaryAgent::new(Arc::new(MockLlm::with_no_tool_calls(fenced)));
        let state = agent.run(AnalysisState::default()).await.unwrap();
        assert!(state.structured_summary.is_some());
    }

    #[tokio::test]
    async fn malformed_json_falls_back_to_default() {
        let agent = StructuredSummaryAgent::new(Arc::new(MockLlm::with_no_tool_calls("not json at all")));
        let state = agent.run(AnalysisState::default()).await.unwrap();
        let summary = state.structured_summary.unwrap();
        assert_eq!(summary.model_confidence, 50.0);
    }

    #[tokio::test]
    async fn unavailable_report_short_circuits_to_data_unavailable() {
        let agent = StructuredSummaryAgent::new(Arc::new(MockLlm::with_no_tool_calls(valid_json())));
        let mut state = AnalysisState::default();
        state.reports.insert("market_report".to_string(), "fetch failed for symbol".to_string());
        let state = agent.run(state).await.unwrap();
        let summary = state.structured_summary.unwrap();
        assert_eq!(summary.model_confidence, 0.0);
        assert_eq!(summary.analysis_summary, "data unavailable");
    }
}
