//! Market data provider adapters (C1) and the priority-ordered orchestrator
//! with write-through quote storage (C2).
//!
//! [`ProviderAdapter`] is the capability contract every upstream source
//! implements; [`orchestrator::ProviderOrchestrator`] resolves priority
//! (durable DB override, then env override, then adapter default), tries
//! adapters in that order, and upserts successful kline fetches into a
//! [`quote_store::QuoteStore`].

pub mod adapter;
pub mod adapters;
pub mod consistency;
pub mod error;
pub mod orchestrator;
pub mod quote;
pub mod quote_store;
pub mod symbol;

pub use adapter::ProviderAdapter;
pub use adapters::{AkShareAdapter, BaoStockAdapter, TushareAdapter};
pub use consistency::{ConsistencyChecker, ConsistencyResult, ResolutionStrategy};
pub use error::ProviderError;
pub use orchestrator::ProviderOrchestrator;
pub use quote::{Adjustment, Bar, DailyBasicRow, NewsItem, Period, Quote, RealtimeQuote};
pub use quote_store::QuoteStore;
pub use symbol::{Market, Symbol};
