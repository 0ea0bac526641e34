//! C2: tries adapters in priority order, returns the first non-empty
//! result, and write-throughs kline fetches into the quote store.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapter::ProviderAdapter;
use crate::consistency::{ConsistencyChecker, ConsistencyResult};
use crate::error::ProviderError;
use crate::quote::{Adjustment, Bar, DailyBasicRow, NewsItem, Period, Quote, RealtimeQuote};
use crate::quote_store::QuoteStore;

/// Promoted priority for an adapter named by `DEFAULT_CHINA_DATA_SOURCE`,
/// high enough to outrank every adapter's built-in default.
const ENV_OVERRIDE_PRIORITY: i32 = 10;

struct RankedAdapter {
    adapter: Arc<dyn ProviderAdapter>,
    priority: i32,
}

pub struct ProviderOrchestrator {
    adapters: Vec<RankedAdapter>,
    store: Arc<QuoteStore>,
    consistency_checker: Option<ConsistencyChecker>,
}

impl ProviderOrchestrator {
    /// Resolves each adapter's effective priority (DB override for `market`
    /// \> env override \> adapter default), then sorts descending.
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>, store: Arc<QuoteStore>, market: &str) -> Self {
        let overrides = store.priority_overrides(market).unwrap_or_default();
        let env_default = std::env::var("DEFAULT_CHINA_DATA_SOURCE").ok().map(|s| s.to_lowercase());

        let mut ranked: Vec<RankedAdapter> = adapters
            .into_iter()
            .map(|adapter| {
                let name = adapter.name().to_lowercase();
                let priority = if let Some((_, p)) = overrides.iter().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
                    *p
                } else if env_default.as_deref() == Some(name.as_str()) {
                    ENV_OVERRIDE_PRIORITY
                } else {
                    adapter.default_priority()
                };
                RankedAdapter { adapter, priority }
            })
            .collect();
        ranked.sort_by(|a, b| b.priority.cmp(&a.priority));

        Self { adapters: ranked, store, consistency_checker: None }
    }

    pub fn with_consistency_checker(mut self, checker: ConsistencyChecker) -> Self {
        self.consistency_checker = Some(checker);
        self
    }

    /// Adapters that currently report available, in priority order.
    async fn available_adapters(&self) -> Vec<&Arc<dyn ProviderAdapter>> {
        let mut out = Vec::new();
        for ranked in &self.adapters {
            if ranked.adapter.available().await {
                out.push(&ranked.adapter);
            } else {
                warn!(adapter = ranked.adapter.name(), "data source not available");
            }
        }
        out
    }

    pub async fn quotes_realtime(&self) -> (Option<std::collections::HashMap<String, RealtimeQuote>>, Option<String>) {
        for adapter in self.available_adapters().await {
            match adapter.quotes_realtime().await {
                Ok(data) if !data.is_empty() => return (Some(data), Some(adapter.name().to_string())),
                Ok(_) => continue,
                Err(e) => {
                    warn!(adapter = adapter.name(), error = %e, "realtime quote fetch failed");
                    continue;
                }
            }
        }
        (None, None)
    }

    /// Fetches a kline, writing each bar through to the quote store on
    /// success. Returns `(bars, origin_adapter_name)`.
    pub async fn kline_with_fallback(
        &self,
        symbol: &str,
        trade_date_hint: &str,
        period: Period,
        limit: usize,
        adjustment: Adjustment,
    ) -> (Option<Vec<Bar>>, Option<String>) {
        for adapter in self.available_adapters().await {
            info!(adapter = adapter.name(), symbol, "trying kline fetch");
            match adapter.kline(symbol, period, limit, adjustment).await {
                Ok(bars) if !bars.is_empty() => {
                    self.write_through(symbol, &bars, adapter.name(), period.as_str(), trade_date_hint);
                    return (Some(bars), Some(adapter.name().to_string()));
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(adapter = adapter.name(), error = %e, "kline fetch failed");
                    continue;
                }
            }
        }
        (None, None)
    }

    fn write_through(&self, symbol: &str, bars: &[Bar], provider: &str, period: &str, _trade_date_hint: &str) {
        let now = chrono::Utc::now().to_rfc3339();
        let quotes: Vec<Quote> = bars
            .iter()
            .map(|bar| Quote {
                symbol: symbol.to_string(),
                trade_date: bar.time.replace(['-', '/'], ""),
                provider: provider.to_string(),
                period: period.to_string(),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                amount: bar.amount,
                ..Default::default()
            })
            .collect();
        if let Err(e) = self.store.upsert_many(&quotes, &now) {
            warn!(error = %e, "write-through upsert failed");
        }
    }

    pub async fn daily_basic_with_fallback(&self, trade_date: &str) -> (Option<Vec<DailyBasicRow>>, Option<String>) {
        for adapter in self.available_adapters().await {
            match adapter.daily_basic(trade_date).await {
                Ok(rows) if !rows.is_empty() => return (Some(rows), Some(adapter.name().to_string())),
                Ok(_) => continue,
                Err(e) => {
                    warn!(adapter = adapter.name(), error = %e, "daily basic fetch failed");
                    continue;
                }
            }
        }
        (None, None)
    }

    /// Fetches from the top two available adapters and runs them through the
    /// consistency checker, when one is configured and at least two adapters
    /// are available. Falls back to plain `daily_basic_with_fallback`
    /// otherwise.
    pub async fn daily_basic_with_consistency_check(
        &self,
        trade_date: &str,
    ) -> (Option<Vec<DailyBasicRow>>, Option<String>, Option<ConsistencyResult>) {
        let available = self.available_adapters().await;
        let Some(checker) = &self.consistency_checker else {
            let (rows, source) = self.daily_basic_with_fallback(trade_date).await;
            return (rows, source, None);
        };
        if available.len() < 2 {
            let (rows, source) = self.daily_basic_with_fallback(trade_date).await;
            return (rows, source, None);
        }

        let primary = available[0];
        let secondary = available[1];
        let primary_rows = primary.daily_basic(trade_date).await.unwrap_or_default();
        let secondary_rows = secondary.daily_basic(trade_date).await.unwrap_or_default();

        if primary_rows.is_empty() {
            let (rows, source) = self.daily_basic_with_fallback(trade_date).await;
            return (rows, source, None);
        }
        if secondary_rows.is_empty() {
            return (Some(primary_rows), Some(primary.name().to_string()), None);
        }

        let result = checker.check_daily_basic(&primary_rows, &secondary_rows);
        let resolved = checker.resolve(primary_rows, secondary_rows, &result);
        (Some(resolved), Some(primary.name().to_string()), Some(result))
    }

    pub async fn news_with_fallback(
        &self,
        code: &str,
        days: u32,
        limit: usize,
        include_announcements: bool,
    ) -> (Option<Vec<NewsItem>>, Option<String>) {
        for adapter in self.available_adapters().await {
            match adapter.news(code, days, limit, include_announcements).await {
                Ok(items) if !items.is_empty() => return (Some(items), Some(adapter.name().to_string())),
                Ok(_) => continue,
                Err(e) => {
                    warn!(adapter = adapter.name(), error = %e, "news fetch failed");
                    continue;
                }
            }
        }
        (None, None)
    }

    pub async fn query_with_fallback(
        &self,
        api_name: &str,
        kwargs: serde_json::Value,
    ) -> (Option<Vec<serde_json::Value>>, Option<String>) {
        for adapter in self.available_adapters().await {
            match adapter.query(api_name, kwargs.clone()).await {
                Ok(rows) if !rows.is_empty() => return (Some(rows), Some(adapter.name().to_string())),
                Ok(_) => continue,
                Err(e) => {
                    warn!(adapter = adapter.name(), error = %e, api_name, "generic query failed");
                    continue;
                }
            }
        }
        (None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeAdapter {
        name: &'static str,
        default_priority: i32,
        available: bool,
        bars: Vec<Bar>,
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ProviderAdapter for FakeAdapter {
        fn name(&self) -> &str {
            self.name
        }
        fn default_priority(&self) -> i32 {
            self.default_priority
        }
        async fn available(&self) -> bool {
            self.available
        }
        async fn quotes_realtime(&self) -> Result<HashMap<String, RealtimeQuote>, ProviderError> {
            Ok(HashMap::new())
        }
        async fn kline(&self, _code: &str, _period: Period, _limit: usize, _adj: Adjustment) -> Result<Vec<Bar>, ProviderError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(self.bars.clone())
        }
        async fn daily_basic(&self, _trade_date: &str) -> Result<Vec<DailyBasicRow>, ProviderError> {
            Ok(vec![])
        }
        async fn news(&self, _code: &str, _days: u32, _limit: usize, _incl: bool) -> Result<Vec<NewsItem>, ProviderError> {
            Ok(vec![])
        }
        async fn query(&self, _api_name: &str, _kwargs: serde_json::Value) -> Result<Vec<serde_json::Value>, ProviderError> {
            Ok(vec![])
        }
    }

    fn bar(time: &str, close: f64) -> Bar {
        Bar { time: time.to_string(), close: Some(close), ..Default::default() }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn falls_back_to_second_adapter_when_first_is_empty() {
        let low_called = Arc::new(AtomicBool::new(false));
        let high_called = Arc::new(AtomicBool::new(false));
        let low = Arc::new(FakeAdapter {
            name: "low",
            default_priority: 1,
            available: true,
            bars: vec![bar("2026-01-01", 10.0)],
            called: low_called.clone(),
        });
        let high = Arc::new(FakeAdapter {
            name: "high",
            default_priority: 5,
            available: true,
            bars: vec![],
            called: high_called.clone(),
        });
        let store = Arc::new(QuoteStore::in_memory().unwrap());
        let orch = ProviderOrchestrator::new(vec![low, high], store, "cn");

        let (bars, source) = orch
            .kline_with_fallback("600000", "20260101", Period::Day, 10, Adjustment::None)
            .await;
        assert_eq!(source.as_deref(), Some("low"));
        assert_eq!(bars.unwrap().len(), 1);
        assert!(high_called.load(Ordering::SeqCst));
        assert!(low_called.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn successful_kline_write_throughs_into_quote_store() {
        let called = Arc::new(AtomicBool::new(false));
        let adapter = Arc::new(FakeAdapter {
            name: "akshare",
            default_priority: 5,
            available: true,
            bars: vec![bar("2026-01-01", 12.3)],
            called,
        });
        let store = Arc::new(QuoteStore::in_memory().unwrap());
        let orch = ProviderOrchestrator::new(vec![adapter], store.clone(), "cn");
        orch.kline_with_fallback("600000", "20260101", Period::Day, 10, Adjustment::None).await;

        let stored = store.get("600000", "20260101", "akshare", "day").unwrap().unwrap();
        assert_eq!(stored.close, Some(12.3));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn db_priority_override_outranks_default() {
        let store = Arc::new(QuoteStore::in_memory().unwrap());
        store.set_priority_override("cn", "low", 99).unwrap();
        let low = Arc::new(FakeAdapter {
            name: "low",
            default_priority: 1,
            available: true,
            bars: vec![bar("2026-01-01", 1.0)],
            called: Arc::new(AtomicBool::new(false)),
        });
        let high = Arc::new(FakeAdapter {
            name: "high",
            default_priority: 5,
            available: true,
            bars: vec![bar("2026-01-01", 2.0)],
            called: Arc::new(AtomicBool::new(false)),
        });
        let orch = ProviderOrchestrator::new(vec![low, high], store, "cn");
        let (bars, source) = orch
            .kline_with_fallback("600000", "20260101", Period::Day, 10, Adjustment::None)
            .await;
        assert_eq!(source.as_deref(), Some("low"));
        assert_eq!(bars.unwrap()[0].close, Some(1.0));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unavailable_adapter_is_skipped() {
        let store = Arc::new(QuoteStore::in_memory().unwrap());
        let down = Arc::new(FakeAdapter {
            name: "down",
            default_priority: 9,
            available: false,
            bars: vec![bar("2026-01-01", 1.0)],
            called: Arc::new(AtomicBool::new(false)),
        });
        let up = Arc::new(FakeAdapter {
            name: "up",
            default_priority: 1,
            available: true,
            bars: vec![bar("2026-01-01", 2.0)],
            called: Arc::new(AtomicBool::new(false)),
        });
        let orch = ProviderOrchestrator::new(vec![down, up], store, "cn");
        let (_, source) = orch
            .kline_with_fallback("600000", "20260101", Period::Day, 10, Adjustment::None)
            .await;
        assert_eq!(source.as_deref(), Some("up"));
    }
}
