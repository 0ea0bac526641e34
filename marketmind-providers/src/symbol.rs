//! Canonical instrument identity. Market classification is a pure function
//! of the raw code; nothing downstream is allowed to mutate it once derived.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Market {
    Mainland,
    HongKong,
    Us,
    Index,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Market::Mainland => "mainland",
            Market::HongKong => "hk",
            Market::Us => "us",
            Market::Index => "index",
        };
        f.write_str(s)
    }
}

/// A tradable instrument's canonical identity: raw code, exchange suffix,
/// market classification, and quote currency.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Symbol {
    pub raw: String,
    pub exchange_suffix: Option<String>,
    pub market: Market,
    pub currency: &'static str,
}

impl Symbol {
    /// Classifies a raw code into a `Symbol`. Strips any `sh`/`sz`/`bj`
    /// prefix or `.SH`/`.SZ`/`.BJ`/`.HK` suffix and pads mainland codes to
    /// six digits, matching the normalization every adapter must do at its
    /// own boundary before this type ever sees the code.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        let upper = trimmed.to_uppercase();

        if let Some(core) = upper.strip_suffix(".HK") {
            return Symbol {
                raw: core.to_string(),
                exchange_suffix: Some("HK".to_string()),
                market: Market::HongKong,
                currency: "HKD",
            };
        }

        for (suffix, exch) in [(".SH", "SH"), (".SZ", "SZ"), (".BJ", "BJ")] {
            if let Some(core) = upper.strip_suffix(suffix) {
                return Symbol {
                    raw: pad_mainland(core),
                    exchange_suffix: Some(exch.to_string()),
                    market: classify_mainland(core, exch),
                    currency: "CNY",
                };
            }
        }

        let lower = trimmed.to_lowercase();
        for (prefix, exch) in [("sh", "SH"), ("sz", "SZ"), ("bj", "BJ")] {
            if let Some(core) = lower.strip_prefix(prefix) {
                if core.chars().all(|c| c.is_ascii_digit()) {
                    return Symbol {
                        raw: pad_mainland(core),
                        exchange_suffix: Some(exch.to_string()),
                        market: classify_mainland(core, exch),
                        currency: "CNY",
                    };
                }
            }
        }

        if upper.chars().all(|c| c.is_ascii_digit()) && !upper.is_empty() {
            let padded = pad_mainland(&upper);
            return Symbol {
                market: classify_mainland(&padded, "SH"),
                raw: padded,
                exchange_suffix: None,
                currency: "CNY",
            };
        }

        Symbol {
            raw: upper,
            exchange_suffix: None,
            market: Market::Us,
            currency: "USD",
        }
    }
}

fn pad_mainland(core: &str) -> String {
    if core.chars().all(|c| c.is_ascii_digit()) {
        format!("{core:0>6}")
    } else {
        core.to_string()
    }
}

/// SSE index codes that don't represent a tradable equity. SZSE reuses some
/// of the same six-digit codes for actual stocks (e.g. `000001` is 平安银行
/// on `.SZ` but 上证指数 on `.SH`), so the exchange matters here.
const KNOWN_SH_INDEX_CODES: &[&str] = &["000001", "000300", "000905", "000016"];
const KNOWN_SZ_INDEX_CODES: &[&str] = &["399001", "399006", "399005"];

fn classify_mainland(core: &str, exchange: &str) -> Market {
    let padded = pad_mainland(core);
    let is_index = match exchange {
        "SH" => KNOWN_SH_INDEX_CODES.contains(&padded.as_str()),
        "SZ" => KNOWN_SZ_INDEX_CODES.contains(&padded.as_str()),
        _ => false,
    };
    if is_index {
        Market::Index
    } else {
        Market::Mainland
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_suffix_and_pads() {
        let s = Symbol::classify("1.SZ");
        assert_eq!(s.raw, "000001");
        assert_eq!(s.market, Market::Mainland);
        assert_eq!(s.currency, "CNY");
    }

    #[test]
    fn strips_sh_prefix() {
        let s = Symbol::classify("sh600000");
        assert_eq!(s.raw, "600000");
        assert_eq!(s.exchange_suffix.as_deref(), Some("SH"));
    }

    #[test]
    fn hk_suffix_classified_as_hong_kong() {
        let s = Symbol::classify("0700.HK");
        assert_eq!(s.market, Market::HongKong);
        assert_eq!(s.currency, "HKD");
    }

    #[test]
    fn bare_us_ticker_falls_back_to_us() {
        let s = Symbol::classify("aapl");
        assert_eq!(s.market, Market::Us);
        assert_eq!(s.currency, "USD");
    }
}
