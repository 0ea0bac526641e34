//! Concrete provider adapters. Each wraps a small `reqwest::Client` pointed
//! at the provider's HTTP surface and normalizes its response shape to the
//! types in [`crate::quote`].

mod akshare;
mod baostock;
mod tushare;

pub use akshare::AkShareAdapter;
pub use baostock::BaoStockAdapter;
pub use tushare::TushareAdapter;
