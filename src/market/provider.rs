//! # Providers
//!
//! Collaborator traits for historical prices and dividend yields, plus the
//! concurrent multi-symbol fetch used by the engine.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use super::series::Period;
use super::series::PriceSeries;

/// Source of historical closing prices.
///
/// Implementations must fail per symbol: an unknown ticker returns an error
/// for that call only.
pub trait PriceHistoryProvider: Send + Sync {
  /// Fetch the ordered closing prices of `symbol` over `period`.
  fn fetch(&self, symbol: &str, period: Period) -> anyhow::Result<PriceSeries>;
}

impl<T: PriceHistoryProvider + ?Sized> PriceHistoryProvider for &T {
  fn fetch(&self, symbol: &str, period: Period) -> anyhow::Result<PriceSeries> {
    (**self).fetch(symbol, period)
  }
}

impl<T: PriceHistoryProvider + ?Sized> PriceHistoryProvider for Arc<T> {
  fn fetch(&self, symbol: &str, period: Period) -> anyhow::Result<PriceSeries> {
    (**self).fetch(symbol, period)
  }
}

impl<T: PriceHistoryProvider + ?Sized> PriceHistoryProvider for Box<T> {
  fn fetch(&self, symbol: &str, period: Period) -> anyhow::Result<PriceSeries> {
    (**self).fetch(symbol, period)
  }
}

/// Source of trailing dividend yields (as fractions, `0.015` = 1.5%).
pub trait DividendYieldProvider: Send + Sync {
  fn dividend_yield(&self, symbol: &str) -> anyhow::Result<f64>;
}

impl<T: DividendYieldProvider + ?Sized> DividendYieldProvider for &T {
  fn dividend_yield(&self, symbol: &str) -> anyhow::Result<f64> {
    (**self).dividend_yield(symbol)
  }
}

/// A symbol that was left out of an aggregate, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFailure {
  pub symbol: String,
  pub reason: String,
}

/// Outcome of a multi-symbol fetch.
#[derive(Clone, Debug, Default)]
pub struct FetchReport {
  /// Non-empty series, in request order.
  pub series: Vec<PriceSeries>,
  /// Symbols that failed or returned no data, in request order.
  pub failures: Vec<SymbolFailure>,
}

impl FetchReport {
  pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
    self.series.iter().find(|s| s.symbol() == symbol)
  }

  pub fn failure(&self, symbol: &str) -> Option<&SymbolFailure> {
    self.failures.iter().find(|f| f.symbol == symbol)
  }
}

/// Fetch every symbol concurrently. Duplicates are fetched once.
pub fn fetch_all<P: PriceHistoryProvider + ?Sized>(
  provider: &P,
  symbols: &[String],
  period: Period,
) -> FetchReport {
  let mut unique: Vec<&String> = Vec::with_capacity(symbols.len());
  for symbol in symbols {
    if !unique.contains(&symbol) {
      unique.push(symbol);
    }
  }

  let fetched: Vec<(&String, anyhow::Result<PriceSeries>)> = unique
    .par_iter()
    .map(|&symbol| (symbol, provider.fetch(symbol, period)))
    .collect();

  let mut report = FetchReport::default();
  for (symbol, result) in fetched {
    match result {
      Ok(series) if !series.is_empty() => report.series.push(series),
      Ok(_) => {
        warn!(symbol = %symbol, %period, "provider returned no price data");
        report.failures.push(SymbolFailure {
          symbol: symbol.clone(),
          reason: "no price data".to_string(),
        });
      }
      Err(err) => {
        warn!(symbol = %symbol, %period, error = %err, "price fetch failed");
        report.failures.push(SymbolFailure {
          symbol: symbol.clone(),
          reason: format!("{err:#}"),
        });
      }
    }
  }

  report
}
