//! Tushare-backed adapter. Tushare is an HTTP JSON-RPC style API
//! (`https://api.tushare.pro`, a single `/dataapi` endpoint dispatched by
//! `api_name`), authenticated with a token. Highest default priority: it is
//! the most reliably rate-limited and SLA-backed of the three sources.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::adapter::ProviderAdapter;
use crate::error::ProviderError;
use crate::quote::{coerce_f64, coerce_string, Adjustment, Bar, DailyBasicRow, NewsItem, Period, RealtimeQuote};

const DEFAULT_BASE_URL: &str = "https://api.tushare.pro";

pub struct TushareAdapter {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl Default for TushareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TushareAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: std::env::var("TUSHARE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            token: std::env::var("TUSHARE_TOKEN").ok(),
        }
    }

    fn ts_code(code: &str) -> String {
        let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
        let padded = format!("{digits:0>6}");
        let exchange = match padded.as_bytes().first() {
            Some(b'6') => "SH",
            Some(b'4') | Some(b'8') => "BJ",
            _ => "SZ",
        };
        format!("{padded}.{exchange}")
    }

    async fn call(&self, api_name: &str, params: serde_json::Value, fields: &str) -> Result<serde_json::Value, ProviderError> {
        let Some(token) = &self.token else {
            return Err(ProviderError::Unsupported("TUSHARE_TOKEN not configured".into()));
        };
        let body = json!({"api_name": api_name, "token": token, "params": params, "fields": fields});
        let resp: serde_json::Value = self
            .client
            .post(&self.base_url)
            .json(&body)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .json()
            .await?;
        if resp.get("code").and_then(|v| v.as_i64()) != Some(0) {
            let msg = resp.get("msg").and_then(|v| v.as_str()).unwrap_or("unknown tushare error");
            return Err(ProviderError::Transport(msg.to_string()));
        }
        Ok(resp)
    }

    /// Tushare returns `{data: {fields: [...], items: [[...], ...]}}`;
    /// zips each row against the field list into a map.
    fn rows_as_objects(resp: &serde_json::Value) -> Vec<serde_json::Value> {
        let data = &resp["data"];
        let fields: Vec<String> = data["fields"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|f| f.as_str().map(str::to_string))
            .collect();
        data["items"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|row| {
                let values = row.as_array().cloned().unwrap_or_default();
                let mut obj = serde_json::Map::new();
                for (field, value) in fields.iter().zip(values) {
                    obj.insert(field.clone(), value);
                }
                serde_json::Value::Object(obj)
            })
            .collect()
    }
}

#[async_trait]
impl ProviderAdapter for TushareAdapter {
    fn name(&self) -> &str {
        "tushare"
    }

    fn default_priority(&self) -> i32 {
        5
    }

    async fn available(&self) -> bool {
        self.token.is_some()
    }

    async fn quotes_realtime(&self) -> Result<HashMap<String, RealtimeQuote>, ProviderError> {
        // Tushare's free tier has no realtime snapshot endpoint; the
        // orchestrator treats this as "empty" and falls through.
        Ok(HashMap::new())
    }

    async fn kline(
        &self,
        code: &str,
        period: Period,
        limit: usize,
        adjustment: Adjustment,
    ) -> Result<Vec<Bar>, ProviderError> {
        if !matches!(period, Period::Day | Period::Week | Period::Month) {
            return Ok(vec![]);
        }
        let api_name = match period {
            Period::Day => "daily",
            Period::Week => "weekly",
            Period::Month => "monthly",
            _ => unreachable!(),
        };
        let adj = match adjustment {
            Adjustment::None => serde_json::Value::Null,
            Adjustment::Forward => json!("qfq"),
            Adjustment::Backward => json!("hfq"),
        };
        let resp = self
            .call(api_name, json!({"ts_code": Self::ts_code(code), "adj": adj}), "trade_date,open,high,low,close,vol,amount")
            .await?;
        let rows = Self::rows_as_objects(&resp);
        let bars = rows
            .into_iter()
            .rev()
            .take(limit)
            .map(|row| Bar {
                time: row.get("trade_date").and_then(coerce_string).unwrap_or_default(),
                open: row.get("open").and_then(coerce_f64),
                high: row.get("high").and_then(coerce_f64),
                low: row.get("low").and_then(coerce_f64),
                close: row.get("close").and_then(coerce_f64),
                volume: row.get("vol").and_then(coerce_f64),
                amount: row.get("amount").and_then(coerce_f64),
            })
            .collect();
        Ok(bars)
    }

    async fn daily_basic(&self, trade_date: &str) -> Result<Vec<DailyBasicRow>, ProviderError> {
        let resp = self
            .call("daily_basic", json!({"trade_date": trade_date}), "ts_code,pe,pb,turnover_rate,total_mv")
            .await?;
        let rows = Self::rows_as_objects(&resp)
            .into_iter()
            .map(|row| DailyBasicRow {
                symbol: row
                    .get("ts_code")
                    .and_then(|v| v.as_str())
                    .map(|s| s.split('.').next().unwrap_or(s).to_string())
                    .unwrap_or_default(),
                pe: row.get("pe").and_then(coerce_f64),
                pb: row.get("pb").and_then(coerce_f64),
                turnover_rate: row.get("turnover_rate").and_then(coerce_f64),
                // Tushare reports total_mv in 万元; normalize to 亿.
                total_mv: row.get("total_mv").and_then(coerce_f64).map(|v| v / 1e4),
            })
            .collect();
        Ok(rows)
    }

    async fn news(
        &self,
        _code: &str,
        _days: u32,
        _limit: usize,
        _include_announcements: bool,
    ) -> Result<Vec<NewsItem>, ProviderError> {
        // Tushare's news endpoint requires a paid credit tier not assumed
        // here; report no data rather than guessing at a schema.
        Ok(vec![])
    }

    async fn query(&self, api_name: &str, kwargs: serde_json::Value) -> Result<Vec<serde_json::Value>, ProviderError> {
        let resp = self.call(api_name, kwargs, "").await?;
        Ok(Self::rows_as_objects(&resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_code_infers_exchange_suffix() {
        assert_eq!(TushareAdapter::ts_code("600000"), "600000.SH");
        assert_eq!(TushareAdapter::ts_code("000001"), "000001.SZ");
        assert_eq!(TushareAdapter::ts_code("430047"), "430047.BJ");
    }

    #[test]
    fn rows_as_objects_zips_fields_and_items() {
        let resp = json!({"data": {"fields": ["a", "b"], "items": [[1, "x"], [2, "y"]]}});
        let rows = TushareAdapter::rows_as_objects(&resp);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["a"], json!(1));
        assert_eq!(rows[1]["b"], json!("y"));
    }
}
