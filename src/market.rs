//! # Market Data
//!
//! Price-history port consumed by the numeric core. The engine never talks to
//! a data vendor directly: it is handed a [`PriceHistoryProvider`] so retries,
//! caching and timeouts can be layered on by the caller.

pub mod memory;
pub mod provider;
pub mod series;
#[cfg(feature = "yahoo")]
pub mod yahoo;

pub use memory::InMemoryMarketData;
pub use memory::trading_days;
pub use provider::DividendYieldProvider;
pub use provider::FetchReport;
pub use provider::PriceHistoryProvider;
pub use provider::SymbolFailure;
pub use provider::fetch_all;
pub use series::Period;
pub use series::PricePoint;
pub use series::PriceSeries;
