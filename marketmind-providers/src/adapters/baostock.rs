//! BaoStock-backed adapter. BaoStock's native protocol is a stateful
//! login/query/logout TCP session with no official HTTP gateway, so this
//! talks to a small sidecar (`BAOSTOCK_GATEWAY_URL`, default
//! `http://127.0.0.1:8902`) that holds the session and exposes each query
//! as a plain HTTP GET. Lowest default priority: BaoStock data lags by one
//! trading day and carries no realtime or news surface at all.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::adapter::ProviderAdapter;
use crate::error::ProviderError;
use crate::quote::{coerce_f64, coerce_string, Adjustment, Bar, DailyBasicRow, NewsItem, Period, RealtimeQuote};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8902";

pub struct BaoStockAdapter {
    client: Client,
    base_url: String,
}

impl Default for BaoStockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BaoStockAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: std::env::var("BAOSTOCK_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn bao_code(code: &str) -> String {
        let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
        let padded = format!("{digits:0>6}");
        let exchange = match padded.as_bytes().first() {
            Some(b'6') => "sh",
            _ => "sz",
        };
        format!("{exchange}.{padded}")
    }
}

#[async_trait]
impl ProviderAdapter for BaoStockAdapter {
    fn name(&self) -> &str {
        "baostock"
    }

    fn default_priority(&self) -> i32 {
        2
    }

    async fn available(&self) -> bool {
        self.client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn quotes_realtime(&self) -> Result<HashMap<String, RealtimeQuote>, ProviderError> {
        // BaoStock has no realtime surface; the orchestrator treats this as
        // "empty" and falls to the next adapter.
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
        let frequency = match period {
            Period::Day => "d",
            Period::Week => "w",
            Period::Month => "m",
            _ => unreachable!(),
        };
        let adjust_flag = match adjustment {
            Adjustment::None => "3",
            Adjustment::Forward => "2",
            Adjustment::Backward => "1",
        };
        let resp: Vec<serde_json::Value> = self
            .client
            .get(self.url("/query_history_k_data_plus"))
            .query(&[
                ("code", Self::bao_code(code).as_str()),
                ("frequency", frequency),
                ("adjustflag", adjust_flag),
            ])
            .send()
            .await?
            .json()
            .await?;
        let bars = resp
            .into_iter()
            .rev()
            .take(limit)
            .rev()
            .map(|row| Bar {
                time: row.get("date").and_then(coerce_string).unwrap_or_default(),
                open: row.get("open").and_then(coerce_f64),
                high: row.get("high").and_then(coerce_f64),
                low: row.get("low").and_then(coerce_f64),
                close: row.get("close").and_then(coerce_f64),
                volume: row.get("volume").and_then(coerce_f64),
                amount: row.get("amount").and_then(coerce_f64),
            })
            .collect();
        Ok(bars)
    }

    async fn daily_basic(&self, trade_date: &str) -> Result<Vec<DailyBasicRow>, ProviderError> {
        let resp: Vec<serde_json::Value> = self
            .client
            .get(self.url("/query_all_stock"))
            .query(&[("day", trade_date)])
            .send()
            .await?
            .json()
            .await?;
        Ok(resp
            .into_iter()
            .filter_map(|row| {
                let code = row.get("code").and_then(|v| v.as_str())?;
                Some(DailyBasicRow {
                    symbol: code.rsplit('.').next().unwrap_or(code).to_string(),
                    pe: row.get("peTTM").and_then(coerce_f64),
                    pb: row.get("pbMRQ").and_then(coerce_f64),
                    turnover_rate: row.get("turn").and_then(coerce_f64),
                    total_mv: None,
                })
            })
            .collect())
    }

    async fn news(
        &self,
        _code: &str,
        _days: u32,
        _limit: usize,
        _include_announcements: bool,
    ) -> Result<Vec<NewsItem>, ProviderError> {
        Ok(vec![])
    }

    async fn query(&self, api_name: &str, kwargs: serde_json::Value) -> Result<Vec<serde_json::Value>, ProviderError> {
        let resp: Vec<serde_json::Value> = self
            .client
            .get(self.url(&format!("/query/{api_name}")))
            .query(&[("kwargs", kwargs.to_string())])
            .send()
            .await?
            .json()
            .await?;
        Ok(resp)
    }
}
