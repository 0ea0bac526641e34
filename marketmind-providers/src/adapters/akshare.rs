//! AKShare-backed adapter. AKShare itself is a Python library with no
//! native Rust binding, so this talks to a small sidecar HTTP service that
//! wraps it (`AKSHARE_GATEWAY_URL`, default `http://127.0.0.1:8901`) and
//! normalizes AKShare's Chinese column names to the canonical shapes.
//!
//! Default priority sits below Tushare: AKShare has no official rate-limit
//! SLA and occasionally lags the exchange by one bar during the open.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::adapter::ProviderAdapter;
use crate::error::ProviderError;
use crate::quote::{coerce_f64, coerce_string, Adjustment, Bar, DailyBasicRow, NewsItem, Period, RealtimeQuote};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8901";
const AVAILABILITY_MEMO_TTL: Duration = Duration::from_secs(30);

pub struct AkShareAdapter {
    client: Client,
    base_url: String,
    last_check: Mutex<Option<(Instant, bool)>>,
}

impl Default for AkShareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AkShareAdapter {
    pub fn new() -> Self {
        let base_url = std::env::var("AKSHARE_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            client: Client::new(),
            base_url,
            last_check: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Strips `sh`/`sz` prefixes and pads to six digits, matching the
    /// contract every adapter must uphold for realtime snapshot keys.
    fn normalize_code(raw: &str) -> String {
        let lower = raw.to_lowercase();
        let core = lower.strip_prefix("sh").or_else(|| lower.strip_prefix("sz")).unwrap_or(&lower);
        format!("{core:0>6}")
    }

    fn full_symbol(code: &str) -> String {
        let code = Self::normalize_code(code);
        let prefix = match code.as_bytes().first() {
            Some(b'6') => "sh",
            Some(b'0') | Some(b'3') => "sz",
            Some(b'4') | Some(b'8') => "bj",
            _ => "sh",
        };
        format!("{prefix}{code}")
    }
}

#[async_trait]
impl ProviderAdapter for AkShareAdapter {
    fn name(&self) -> &str {
        "akshare"
    }

    fn default_priority(&self) -> i32 {
        4
    }

    async fn available(&self) -> bool {
        if let Some((checked_at, ok)) = *self.last_check.lock().unwrap() {
            if checked_at.elapsed() < AVAILABILITY_MEMO_TTL {
                return ok;
            }
        }
        let ok = self
            .client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        *self.last_check.lock().unwrap() = Some((Instant::now(), ok));
        ok
    }

    async fn quotes_realtime(&self) -> Result<HashMap<String, RealtimeQuote>, ProviderError> {
        let resp: Vec<serde_json::Value> =
            self.client.get(self.url("/stock_zh_a_spot")).send().await?.json().await?;
        let mut out = HashMap::new();
        for row in resp {
            let Some(code) = row.get("代码").and_then(|v| v.as_str()) else { continue };
            out.insert(
                Self::normalize_code(code),
                RealtimeQuote {
                    close: row.get("最新价").and_then(coerce_f64),
                    pct_chg: row.get("涨跌幅").and_then(coerce_f64),
                    volume: row.get("成交量").and_then(coerce_f64),
                    amount: row.get("成交额").and_then(coerce_f64),
                },
            );
        }
        Ok(out)
    }

    async fn kline(
        &self,
        code: &str,
        period: Period,
        limit: usize,
        adjustment: Adjustment,
    ) -> Result<Vec<Bar>, ProviderError> {
        let symbol = Self::normalize_code(code);
        let akshare_period = match period {
            Period::Day => "daily",
            Period::Week => "weekly",
            Period::Month => "monthly",
            // AKShare has no minute-bar endpoint for A-shares in the free tier.
            Period::Min1 | Period::Min5 | Period::Min15 | Period::Min30 | Period::Min60 => {
                debug!(%symbol, period = period.as_str(), "akshare has no minute-bar data, returning empty");
                return Ok(vec![]);
            }
        };
        let adjust = match adjustment {
            Adjustment::None => "",
            Adjustment::Forward => "qfq",
            Adjustment::Backward => "hfq",
        };

        let resp: Vec<serde_json::Value> = self
            .client
            .get(self.url("/stock_zh_a_hist"))
            .query(&[("symbol", symbol.as_str()), ("period", akshare_period), ("adjust", adjust)])
            .send()
            .await?
            .json()
            .await?;

        let bars: Vec<Bar> = resp
            .into_iter()
            .rev()
            .take(limit)
            .rev()
            .map(|row| Bar {
                time: row.get("日期").and_then(coerce_string).unwrap_or_default(),
                open: row.get("开盘").and_then(coerce_f64),
                high: row.get("最高").and_then(coerce_f64),
                low: row.get("最低").and_then(coerce_f64),
                close: row.get("收盘").and_then(coerce_f64),
                volume: row.get("成交量").and_then(coerce_f64),
                amount: row.get("成交额").and_then(coerce_f64),
            })
            .collect();
        Ok(bars)
    }

    async fn daily_basic(&self, trade_date: &str) -> Result<Vec<DailyBasicRow>, ProviderError> {
        let resp: Vec<serde_json::Value> = self
            .client
            .get(self.url("/stock_a_indicator_lg"))
            .query(&[("trade_date", trade_date)])
            .send()
            .await?
            .json()
            .await?;
        Ok(resp
            .into_iter()
            .filter_map(|row| {
                let symbol = row.get("代码").and_then(|v| v.as_str())?;
                Some(DailyBasicRow {
                    symbol: Self::normalize_code(symbol),
                    pe: row.get("市盈率").and_then(coerce_f64),
                    pb: row.get("市净率").and_then(coerce_f64),
                    turnover_rate: row.get("换手率").and_then(coerce_f64),
                    total_mv: row.get("总市值").and_then(coerce_f64).map(|v| v / 1e8),
                })
            })
            .collect())
    }

    async fn news(
        &self,
        code: &str,
        days: u32,
        limit: usize,
        include_announcements: bool,
    ) -> Result<Vec<NewsItem>, ProviderError> {
        let symbol = Self::full_symbol(code);
        let resp: Vec<serde_json::Value> = self
            .client
            .get(self.url("/stock_news_em"))
            .query(&[("symbol", symbol.as_str()), ("days", &days.to_string())])
            .send()
            .await?
            .json()
            .await?;
        let items: Vec<NewsItem> = resp
            .into_iter()
            .filter(|row| include_announcements || row.get("is_announcement").and_then(|v| v.as_bool()) != Some(true))
            .take(limit)
            .map(|row| NewsItem {
                title: row.get("新闻标题").and_then(coerce_string).unwrap_or_default(),
                content: row.get("新闻内容").and_then(coerce_string),
                url: row.get("新闻链接").and_then(coerce_string),
                published_at: row.get("发布时间").and_then(coerce_string),
                is_announcement: row.get("is_announcement").and_then(|v| v.as_bool()).unwrap_or(false),
            })
            .collect();
        Ok(items)
    }

    async fn query(&self, api_name: &str, kwargs: serde_json::Value) -> Result<Vec<serde_json::Value>, ProviderError> {
        let resp: Vec<serde_json::Value> = self
            .client
            .post(self.url(&format!("/query/{api_name}")))
            .json(&json!({"kwargs": kwargs}))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp)
    }
}
