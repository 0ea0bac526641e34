//! SQLite-backed write-through store for fetched quotes, and the durable
//! per-market priority overrides the orchestrator reads at construction.
//!
//! Uses the same blocking-call-under-a-lock pattern as the task store
//! elsewhere in this workspace: `tokio::task::block_in_place` plus a
//! `Mutex<Connection>`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::ProviderError;
use crate::quote::Quote;

pub struct QuoteStore {
    db: Arc<Mutex<rusqlite::Connection>>,
}

impl QuoteStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let conn = rusqlite::Connection::open(path.as_ref())?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS quotes (
                symbol TEXT NOT NULL,
                trade_date TEXT NOT NULL,
                provider TEXT NOT NULL,
                period TEXT NOT NULL,
                open REAL, high REAL, low REAL, close REAL,
                volume REAL, amount REAL,
                pe REAL, pb REAL, turnover_rate REAL, total_mv REAL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (symbol, trade_date, provider, period)
            );
            CREATE TABLE IF NOT EXISTS provider_priority_overrides (
                market TEXT NOT NULL,
                provider TEXT NOT NULL,
                priority INTEGER NOT NULL,
                PRIMARY KEY (market, provider)
            );
            "#,
        )?;
        Ok(Self { db: Arc::new(Mutex::new(conn)) })
    }

    /// In-memory store for tests and for environments with no durable path.
    pub fn in_memory() -> Result<Self, ProviderError> {
        Self::new(":memory:")
    }

    /// Upserts one quote keyed by (symbol, trade_date, provider, period).
    /// The only permitted mutation on this table; there is no delete.
    pub fn upsert(&self, quote: &Quote, now_rfc3339: &str) -> Result<(), ProviderError> {
        let db = self.db.clone();
        let quote = quote.clone();
        let now = now_rfc3339.to_string();
        tokio::task::block_in_place(move || {
            let conn = db.lock().map_err(|_| ProviderError::Store("lock poisoned".into()))?;
            conn.execute(
                "INSERT INTO quotes
                    (symbol, trade_date, provider, period, open, high, low, close,
                     volume, amount, pe, pb, turnover_rate, total_mv, updated_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)
                 ON CONFLICT(symbol, trade_date, provider, period) DO UPDATE SET
                    open=excluded.open, high=excluded.high, low=excluded.low, close=excluded.close,
                    volume=excluded.volume, amount=excluded.amount, pe=excluded.pe, pb=excluded.pb,
                    turnover_rate=excluded.turnover_rate, total_mv=excluded.total_mv,
                    updated_at=excluded.updated_at",
                rusqlite::params![
                    quote.symbol, quote.trade_date, quote.provider, quote.period,
                    quote.open, quote.high, quote.low, quote.close,
                    quote.volume, quote.amount, quote.pe, quote.pb,
                    quote.turnover_rate, quote.total_mv, now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn upsert_many(&self, quotes: &[Quote], now_rfc3339: &str) -> Result<usize, ProviderError> {
        let mut n = 0;
        for q in quotes {
            self.upsert(q, now_rfc3339)?;
            n += 1;
        }
        Ok(n)
    }

    pub fn get(&self, symbol: &str, trade_date: &str, provider: &str, period: &str) -> Result<Option<Quote>, ProviderError> {
        let db = self.db.clone();
        let (symbol, trade_date, provider, period) =
            (symbol.to_string(), trade_date.to_string(), provider.to_string(), period.to_string());
        tokio::task::block_in_place(move || {
            let conn = db.lock().map_err(|_| ProviderError::Store("lock poisoned".into()))?;
            let mut stmt = conn.prepare(
                "SELECT symbol, trade_date, provider, period, open, high, low, close,
                        volume, amount, pe, pb, turnover_rate, total_mv
                 FROM quotes WHERE symbol=?1 AND trade_date=?2 AND provider=?3 AND period=?4",
            )?;
            let mut rows = stmt.query(rusqlite::params![symbol, trade_date, provider, period])?;
            if let Some(row) = rows.next()? {
                Ok(Some(Quote {
                    symbol: row.get(0)?,
                    trade_date: row.get(1)?,
                    provider: row.get(2)?,
                    period: row.get(3)?,
                    open: row.get(4)?,
                    high: row.get(5)?,
                    low: row.get(6)?,
                    close: row.get(7)?,
                    volume: row.get(8)?,
                    amount: row.get(9)?,
                    pe: row.get(10)?,
                    pb: row.get(11)?,
                    turnover_rate: row.get(12)?,
                    total_mv: row.get(13)?,
                }))
            } else {
                Ok(None)
            }
        })
    }

    /// Priority overrides for one market, keyed by (lowercased) provider name.
    pub fn priority_overrides(&self, market: &str) -> Result<Vec<(String, i32)>, ProviderError> {
        let db = self.db.clone();
        let market = market.to_string();
        tokio::task::block_in_place(move || {
            let conn = db.lock().map_err(|_| ProviderError::Store("lock poisoned".into()))?;
            let mut stmt = conn.prepare("SELECT provider, priority FROM provider_priority_overrides WHERE market=?1")?;
            let rows = stmt.query_map(rusqlite::params![market], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as i32))
            })?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }

    pub fn set_priority_override(&self, market: &str, provider: &str, priority: i32) -> Result<(), ProviderError> {
        let db = self.db.clone();
        let (market, provider) = (market.to_string(), provider.to_string());
        tokio::task::block_in_place(move || {
            let conn = db.lock().map_err(|_| ProviderError::Store("lock poisoned".into()))?;
            conn.execute(
                "INSERT INTO provider_priority_overrides (market, provider, priority) VALUES (?1,?2,?3)
                 ON CONFLICT(market, provider) DO UPDATE SET priority=excluded.priority",
                rusqlite::params![market, provider, priority],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quote() -> Quote {
        Quote {
            symbol: "600000".to_string(),
            trade_date: "20260101".to_string(),
            provider: "tushare".to_string(),
            period: "day".to_string(),
            close: Some(10.5),
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_then_get_roundtrips() {
        let store = QuoteStore::in_memory().unwrap();
        store.upsert(&sample_quote(), "2026-01-01T00:00:00Z").unwrap();
        let got = store.get("600000", "20260101", "tushare", "day").unwrap().unwrap();
        assert_eq!(got.close, Some(10.5));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_overwrites_same_identity() {
        let store = QuoteStore::in_memory().unwrap();
        store.upsert(&sample_quote(), "2026-01-01T00:00:00Z").unwrap();
        let mut updated = sample_quote();
        updated.close = Some(11.0);
        store.upsert(&updated, "2026-01-02T00:00:00Z").unwrap();
        let got = store.get("600000", "20260101", "tushare", "day").unwrap().unwrap();
        assert_eq!(got.close, Some(11.0));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn priority_override_roundtrips_and_updates() {
        let store = QuoteStore::in_memory().unwrap();
        store.set_priority_override("cn", "akshare", 5).unwrap();
        store.set_priority_override("cn", "akshare", 9).unwrap();
        let overrides = store.priority_overrides("cn").unwrap();
        assert_eq!(overrides, vec![("akshare".to_string(), 9)]);
    }
}
