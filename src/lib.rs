//! # allocation-rs
//!
//! Quantitative portfolio engine: return statistics from historical prices,
//! long-only maximum-Sharpe allocation seeded from risk-tier templates,
//! efficient frontier, rebalancing diffs, tax-loss screening, historical
//! simulation and scenario metrics.
//!
//! Price history enters through [`market::PriceHistoryProvider`], so the
//! numeric core runs against canned data as easily as against a vendor.

pub mod error;
pub mod market;
pub mod quant;

pub use error::EngineError;
pub use error::Result;
