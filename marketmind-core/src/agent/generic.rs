//! Generic agent: the (role-prompt, tool-list, LLM-handle) triple that backs
//! every Stage-A analyst node. One `GenericAgent` instance per enabled
//! [`AgentRecord`](crate::records::AgentRecord); the controller does not
//! special-case any particular analyst.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::records::AgentRecord;
use crate::state::{AnalysisState, ToolCall, ToolResult};
use crate::tools::AggregateToolSource;
use crate::traits::Agent;

/// Bound on the ReAct loop so a misbehaving model can't spin forever.
const DEFAULT_MAX_STEPS: u32 = 6;

/// One analyst node: runs `record`'s role prompt in a bounded tool-calling
/// loop against `llm`, using whatever tools `record.tools` allows out of
/// `tool_source`.
pub struct GenericAgent {
    record: AgentRecord,
    llm: Arc<dyn LlmClient>,
    tool_source: Arc<AggregateToolSource>,
    unavailable_providers: Vec<String>,
    max_steps: u32,
}

impl GenericAgent {
    pub fn new(
        record: AgentRecord,
        llm: Arc<dyn LlmClient>,
        tool_source: Arc<AggregateToolSource>,
        unavailable_providers: Vec<String>,
    ) -> Self {
        Self {
            record,
            llm,
            tool_source,
            unavailable_providers,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn opening_message(&self, state: &AnalysisState) -> Message {
        Message::user(format!(
            "Symbol: {}\nCompany: {}\nTrade date: {}\nCurrency: {}\n\nProduce your report now.",
            state.symbol, state.company_name, state.trade_date, state.currency
        ))
    }
}

#[async_trait]
impl Agent for GenericAgent {
    type State = AnalysisState;

    fn name(&self) -> &str {
        &self.record.node_label
    }

    async fn run(&self, mut state: AnalysisState) -> Result<AnalysisState, AgentError> {
        let tools = self
            .tool_source
            .filtered(self.record.tools.as_deref(), &self.unavailable_providers)
            .await;
        let tool_names: Vec<String> = tools.iter().map(|t| t.name().to_string()).collect();

        let mut messages = vec![
            Message::system(self.record.role_definition.clone()),
            self.opening_message(&state),
        ];

        let mut final_content = String::new();
        for _ in 0..self.max_steps {
            let response = self.llm.invoke(&messages).await?;

            if response.tool_calls.is_empty() {
                final_content = response.content;
                break;
            }

            messages.push(Message::assistant(response.content.clone()));
            final_content = response.content;

            for call in &response.tool_calls {
                if !tool_names.iter().any(|n| n == &call.name) {
                    continue;
                }
                let result = self
                    .tool_source
                    .call_with_context(&call.name, call.arguments.clone(), None)
                    .await;
                let (content, is_error) = match result {
                    Ok(c) => (c.text, false),
                    Err(e) => (e.to_string(), true),
                };
                state.tool_calls.push(ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                });
                state.tool_results.push(ToolResult {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    content: content.clone(),
                    is_error,
                });
                messages.push(Message::user(format!("[tool {} result] {content}", call.name)));
            }
        }

        state
            .reports
            .insert(self.record.report_key(), final_content);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::tools::{AggregateToolSource, Tool};
    use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
    use async_trait::async_trait;

    fn record() -> AgentRecord {
        AgentRecord::new(
            "market-analyst".to_string(),
            "Market Analyst".to_string(),
            "You analyze the market.".to_string(),
            None,
            None,
            vec![],
            None,
        )
    }

    #[tokio::test]
    async fn writes_report_into_both_state_locations() {
        let llm = Arc::new(MockLlm::with_no_tool_calls("trend is bullish"));
        let tools = Arc::new(AggregateToolSource::new());
        let agent = GenericAgent::new(record(), llm, tools, vec![]);

        let state = AnalysisState {
            symbol: "600519".to_string(),
            company_name: "Kweichow Moutai".to_string(),
            trade_date: "2026-07-26".to_string(),
            currency: "CNY".to_string(),
            ..Default::default()
        };

        let result = agent.run(state).await.unwrap();
        assert_eq!(result.reports["market_report"], "trend is bullish");
    }

    struct GetQuoteTool;

    #[async_trait]
    impl Tool for GetQuoteTool {
        fn name(&self) -> &str {
            "get_quote"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "get_quote".into(),
                description: None,
                input_schema: serde_json::json!({}),
            }
        }
        async fn call(
            &self,
            _args: serde_json::Value,
            _ctx: Option<&ToolCallContext>,
        ) -> Result<ToolCallContent, ToolSourceError> {
            Ok(ToolCallContent::new("last close: 1680.00"))
        }
    }

    #[tokio::test]
    async fn tool_call_round_trips_into_tool_calls_and_results() {
        let llm = Arc::new(MockLlm::first_tools_then_end(
            "checking quote",
            vec![ToolCall {
                id: "call-1".into(),
                name: "get_quote".into(),
                arguments: serde_json::json!({}),
            }],
            "price confirms the uptrend",
        ));
        let tools = Arc::new(AggregateToolSource::new());
        tools.register_sync(Box::new(GetQuoteTool));
        let agent = GenericAgent::new(record(), llm, tools, vec![]);

        let result = agent.run(AnalysisState::default()).await.unwrap();
        assert_eq!(result.reports["market_report"], "price confirms the uptrend");
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_results[0].content, "last close: 1680.00");
        assert!(!result.tool_results[0].is_error);
    }

    #[tokio::test]
    async fn unavailable_tool_is_filtered_out_of_allow_list() {
        let mut with_provider_record = record();
        with_provider_record.tools = Some(vec!["get_quote".to_string()]);
        let llm = Arc::new(MockLlm::with_no_tool_calls("no data available"));
        let tools = Arc::new(AggregateToolSource::new());
        tools.register_sync(Box::new(GetQuoteTool));
        let agent = GenericAgent::new(with_provider_record, llm, tools, vec!["akshare".to_string()]);

        let result = agent.run(AnalysisState::default()).await.unwrap();
        assert_eq!(result.reports["market_report"], "no data available");
    }
}
