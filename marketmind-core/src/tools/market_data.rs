//! Exposes the C2 provider orchestrator as a callable tool, so analyst
//! nodes can pull kline/fundamentals/news through the LLM's tool-call loop
//! the same way they call every other tool.

use async_trait::async_trait;
use marketmind_providers::{Adjustment, Period, ProviderOrchestrator};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
use crate::tools::Tool;

/// Operation requested of the orchestrator; mirrors the adapter contract
/// (kline / daily_basic / news / realtime) plus the generic escape hatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operation {
    Kline,
    DailyBasic,
    News,
    Realtime,
    Query,
}

impl Operation {
    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "kline" => Operation::Kline,
            "daily_basic" => Operation::DailyBasic,
            "news" => Operation::News,
            "realtime" => Operation::Realtime,
            "query" => Operation::Query,
            _ => return None,
        })
    }
}

pub struct MarketDataTool {
    orchestrator: Arc<ProviderOrchestrator>,
}

impl MarketDataTool {
    pub fn new(orchestrator: Arc<ProviderOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for MarketDataTool {
    fn name(&self) -> &str {
        "market_data"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "market_data".to_string(),
            description: Some(
                "Fetch market data (kline bars, daily fundamentals, news, or a realtime \
                 snapshot) for a symbol, falling back across data sources by priority."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "operation": {"type": "string", "enum": ["kline", "daily_basic", "news", "realtime", "query"]},
                    "symbol": {"type": "string"},
                    "trade_date": {"type": "string", "description": "YYYYMMDD, required for daily_basic"},
                    "period": {"type": "string", "enum": ["day", "week", "month", "1min", "5min", "15min", "30min", "60min"]},
                    "limit": {"type": "integer"},
                    "days": {"type": "integer"},
                    "include_announcements": {"type": "boolean"},
                    "api_name": {"type": "string", "description": "required for operation=query"},
                    "kwargs": {"type": "object"}
                },
                "required": ["operation"]
            }),
        }
    }

    async fn call(&self, args: Value, _ctx: Option<&ToolCallContext>) -> Result<ToolCallContent, ToolSourceError> {
        let operation = args
            .get("operation")
            .and_then(|v| v.as_str())
            .and_then(Operation::parse)
            .ok_or_else(|| ToolSourceError::JsonRpc("operation must be one of kline/daily_basic/news/realtime/query".into()))?;

        let symbol = args.get("symbol").and_then(|v| v.as_str()).unwrap_or_default();

        let (result, source) = match operation {
            Operation::Kline => {
                let period = args
                    .get("period")
                    .and_then(|v| v.as_str())
                    .and_then(Period::parse)
                    .unwrap_or(Period::Day);
                let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(120) as usize;
                let trade_date = args.get("trade_date").and_then(|v| v.as_str()).unwrap_or_default();
                let (bars, source) = self
                    .orchestrator
                    .kline_with_fallback(symbol, trade_date, period, limit, Adjustment::None)
                    .await;
                (json!(bars.unwrap_or_default()), source)
            }
            Operation::DailyBasic => {
                let trade_date = args
                    .get("trade_date")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ToolSourceError::JsonRpc("trade_date is required for daily_basic".into()))?;
                let (rows, source) = self.orchestrator.daily_basic_with_fallback(trade_date).await;
                (json!(rows.unwrap_or_default()), source)
            }
            Operation::News => {
                let days = args.get("days").and_then(|v| v.as_u64()).unwrap_or(2) as u32;
                let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(50) as usize;
                let include_announcements = args.get("include_announcements").and_then(|v| v.as_bool()).unwrap_or(true);
                let (items, source) = self.orchestrator.news_with_fallback(symbol, days, limit, include_announcements).await;
                (json!(items.unwrap_or_default()), source)
            }
            Operation::Realtime => {
                let (quotes, source) = self.orchestrator.quotes_realtime().await;
                (json!(quotes.unwrap_or_default()), source)
            }
            Operation::Query => {
                let api_name = args
                    .get("api_name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ToolSourceError::JsonRpc("api_name is required for operation=query".into()))?;
                let kwargs = args.get("kwargs").cloned().unwrap_or(Value::Null);
                let (rows, source) = self.orchestrator.query_with_fallback(api_name, kwargs).await;
                (json!(rows.unwrap_or_default()), source)
            }
        };

        Ok(ToolCallContent::new(json!({"source": source, "data": result}).to_string()))
    }
}
