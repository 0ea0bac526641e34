//! The C1 adapter contract: one capability record per upstream data source.
//! Stateless from the orchestrator's point of view — `priority` is mutable
//! only during adapter-set construction (see [`crate::orchestrator`]).

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::quote::{Adjustment, Bar, DailyBasicRow, NewsItem, Period, RealtimeQuote};

/// A market-data provider. Implementations normalize upstream-native shapes
/// (column names, code prefixes, units) to the canonical types in
/// [`crate::quote`] before returning.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable name, e.g. `"tushare"`, `"akshare"`, `"baostock"`.
    fn name(&self) -> &str;

    /// Built-in default priority, used when no DB or env override applies.
    fn default_priority(&self) -> i32;

    /// Cheap liveness check; implementations may memoize the result.
    async fn available(&self) -> bool;

    /// Whole-market realtime snapshot, keyed by six-digit code.
    async fn quotes_realtime(&self) -> Result<HashMap<String, RealtimeQuote>, ProviderError>;

    /// OHLCV bars. `limit` is a soft upper bound. Returns an empty vec
    /// (never an error) when the (code, period) combination has no data.
    async fn kline(
        &self,
        code: &str,
        period: Period,
        limit: usize,
        adjustment: Adjustment,
    ) -> Result<Vec<Bar>, ProviderError>;

    /// Per-symbol fundamentals for one trading day.
    async fn daily_basic(&self, trade_date: &str) -> Result<Vec<DailyBasicRow>, ProviderError>;

    /// News and (optionally) announcements for one symbol.
    async fn news(
        &self,
        code: &str,
        days: u32,
        limit: usize,
        include_announcements: bool,
    ) -> Result<Vec<NewsItem>, ProviderError>;

    /// Generic escape hatch for long-tail operations not covered by the
    /// typed methods above. Implementations translate `api_name` to an
    /// upstream-native call and normalize the resulting columns.
    async fn query(
        &self,
        api_name: &str,
        kwargs: serde_json::Value,
    ) -> Result<Vec<serde_json::Value>, ProviderError>;
}
