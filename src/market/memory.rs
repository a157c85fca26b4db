//! # In-Memory Market Data
//!
//! Canned prices and dividend yields. Used for tests and for callers that
//! pre-load history from their own store.

use std::collections::HashMap;

use anyhow::anyhow;
use chrono::Datelike;
use chrono::Days;
use chrono::NaiveDate;
use chrono::Weekday;

use super::provider::DividendYieldProvider;
use super::provider::PriceHistoryProvider;
use super::series::Period;
use super::series::PricePoint;
use super::series::PriceSeries;

/// `n` consecutive weekdays starting at `start` (rolled forward off a weekend).
pub fn trading_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
  let mut out = Vec::with_capacity(n);
  let mut day = start;
  while out.len() < n {
    if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
      out.push(day);
    }
    day = match day.checked_add_days(Days::new(1)) {
      Some(next) => next,
      None => break,
    };
  }
  out
}

/// Price and dividend data held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMarketData {
  prices: HashMap<String, PriceSeries>,
  yields: HashMap<String, f64>,
}

impl InMemoryMarketData {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a full series, replacing any previous one for the symbol.
  #[must_use]
  pub fn with_series(mut self, series: PriceSeries) -> Self {
    self.prices.insert(series.symbol().to_string(), series);
    self
  }

  /// Register closes laid out on consecutive weekdays from `start`.
  pub fn with_closes(
    self,
    symbol: &str,
    start: NaiveDate,
    closes: &[f64],
  ) -> anyhow::Result<Self> {
    let points = trading_days(start, closes.len())
      .into_iter()
      .zip(closes.iter())
      .map(|(date, &close)| PricePoint::new(date, close))
      .collect();
    Ok(self.with_series(PriceSeries::new(symbol, points)?))
  }

  #[must_use]
  pub fn with_dividend_yield(mut self, symbol: &str, dividend_yield: f64) -> Self {
    self.yields.insert(symbol.to_string(), dividend_yield);
    self
  }

  pub fn symbols(&self) -> Vec<&str> {
    let mut symbols: Vec<&str> = self.prices.keys().map(String::as_str).collect();
    symbols.sort_unstable();
    symbols
  }
}

impl PriceHistoryProvider for InMemoryMarketData {
  fn fetch(&self, symbol: &str, period: Period) -> anyhow::Result<PriceSeries> {
    self
      .prices
      .get(symbol)
      .map(|series| series.window(period))
      .ok_or_else(|| anyhow!("unknown symbol {symbol}"))
  }
}

impl DividendYieldProvider for InMemoryMarketData {
  fn dividend_yield(&self, symbol: &str) -> anyhow::Result<f64> {
    self
      .yields
      .get(symbol)
      .copied()
      .ok_or_else(|| anyhow!("no dividend yield for {symbol}"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trading_days_skip_weekends() {
    // 2024-01-05 is a Friday.
    let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    let days = trading_days(start, 3);
    assert_eq!(
      days,
      vec![
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
      ]
    );
  }

  #[test]
  fn fetch_applies_window() {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let closes: Vec<f64> = (0..1500).map(|i| 100.0 + i as f64 * 0.01).collect();
    let market = InMemoryMarketData::new()
      .with_closes("VTI", start, &closes)
      .unwrap();

    let all = market.fetch("VTI", Period::Max).unwrap();
    let one = market.fetch("VTI", Period::Years(1)).unwrap();
    assert_eq!(all.len(), 1500);
    assert!(one.len() < all.len());
    assert!(one.len() >= 250);
    assert!(market.fetch("XYZ", Period::Max).is_err());
  }

  #[test]
  fn dividend_lookup_fails_for_unknown() {
    let market = InMemoryMarketData::new().with_dividend_yield("VTI", 0.013);
    assert_eq!(market.dividend_yield("VTI").unwrap(), 0.013);
    assert!(market.dividend_yield("GSG").is_err());
  }
}
