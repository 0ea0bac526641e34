//! Wire-level data shapes returned by provider adapters and stored by the
//! quote store. All numeric fields are `Option` — adapters return null
//! rather than fabricate a value, per the adapter contract.

use serde::{Deserialize, Serialize};

/// Trading period for a kline request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Min1,
    Min5,
    Min15,
    Min30,
    Min60,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Min1 => "1min",
            Period::Min5 => "5min",
            Period::Min15 => "15min",
            Period::Min30 => "30min",
            Period::Min60 => "60min",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "day" => Period::Day,
            "week" => Period::Week,
            "month" => Period::Month,
            "1min" => Period::Min1,
            "5min" => Period::Min5,
            "15min" => Period::Min15,
            "30min" => Period::Min30,
            "60min" => Period::Min60,
            _ => return None,
        })
    }
}

/// Adjustment applied to a kline request (forward/backward/none).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjustment {
    None,
    Forward,
    Backward,
}

/// One (symbol, trade_date, provider, period) row. Identity is the
/// four-tuple; re-fetching for the same tuple overwrites.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub trade_date: String,
    pub provider: String,
    pub period: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub amount: Option<f64>,
    /// Price-to-earnings ratio.
    pub pe: Option<f64>,
    /// Price-to-book ratio.
    pub pb: Option<f64>,
    pub turnover_rate: Option<f64>,
    /// Total market cap, normalized to 亿 (hundred million CNY) at the
    /// adapter boundary.
    pub total_mv: Option<f64>,
}

/// One bar returned by `ProviderAdapter::kline`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Bar {
    pub time: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub amount: Option<f64>,
}

/// One row returned by `ProviderAdapter::daily_basic`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DailyBasicRow {
    pub symbol: String,
    pub pe: Option<f64>,
    pub pb: Option<f64>,
    pub turnover_rate: Option<f64>,
    pub total_mv: Option<f64>,
}

/// One news item (or announcement) returned by `ProviderAdapter::news`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub is_announcement: bool,
}

/// A whole-market realtime snapshot row. Keyed by six-digit, prefix-stripped
/// code in the map returned by `quotes_realtime()`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RealtimeQuote {
    pub close: Option<f64>,
    pub pct_chg: Option<f64>,
    pub volume: Option<f64>,
    pub amount: Option<f64>,
}

/// Null-safe numeric coercion: upstream payloads send `""`, `"None"`, or NaN
/// for missing values; this turns all three into `None` instead of `0.0`.
pub fn coerce_f64(raw: &serde_json::Value) -> Option<f64> {
    match raw {
        serde_json::Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("nan") {
                None
            } else {
                s.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
        _ => None,
    }
}

pub fn coerce_string(raw: &serde_json::Value) -> Option<String> {
    match raw {
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(s.to_string())
            }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_f64_treats_none_and_empty_as_null() {
        assert_eq!(coerce_f64(&json!("")), None);
        assert_eq!(coerce_f64(&json!("None")), None);
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!("12.5")), Some(12.5));
        assert_eq!(coerce_f64(&json!(3.0)), Some(3.0));
    }

    #[test]
    fn coerce_string_trims_and_nulls_none() {
        assert_eq!(coerce_string(&json!("  hello  ")), Some("hello".to_string()));
        assert_eq!(coerce_string(&json!("None")), None);
        assert_eq!(coerce_string(&json!(null)), None);
    }
}
