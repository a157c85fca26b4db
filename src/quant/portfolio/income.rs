//! # Income Estimate
//!
//! $$
//! I = \sum_i w_i \, A \, y_i
//! $$
//!
//! Expected annual dividend income of an allocation of `A` dollars.

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use super::types::AssetAllocation;
use crate::error::EngineError;
use crate::error::Result;
use crate::market::DividendYieldProvider;
use crate::market::SymbolFailure;

/// Income over the symbols whose yield could be fetched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeEstimate {
  /// Dollars per year, rounded to cents.
  pub annual_income: f64,
  /// Symbols left out of the sum.
  pub skipped: Vec<SymbolFailure>,
}

impl IncomeEstimate {
  /// True when every symbol contributed.
  pub fn is_complete(&self) -> bool {
    self.skipped.is_empty()
  }
}

/// Sum `weight * amount * yield` over the allocation. A failed yield lookup
/// skips that symbol and is reported in [`IncomeEstimate::skipped`].
pub fn estimate_annual_income<D: DividendYieldProvider + ?Sized>(
  allocation: &AssetAllocation,
  amount: f64,
  provider: &D,
) -> Result<IncomeEstimate> {
  if !amount.is_finite() || amount < 0.0 {
    return Err(EngineError::invalid_parameter(format!(
      "investment amount must be finite and non-negative, got {amount}"
    )));
  }

  let mut income = 0.0;
  let mut skipped = Vec::new();
  for (symbol, weight) in allocation.iter() {
    match provider.dividend_yield(symbol) {
      Ok(dividend_yield) if dividend_yield.is_finite() => {
        income += weight * amount * dividend_yield;
      }
      Ok(dividend_yield) => {
        warn!(symbol, dividend_yield, "skipping non-finite dividend yield");
        skipped.push(SymbolFailure {
          symbol: symbol.to_string(),
          reason: format!("non-finite dividend yield {dividend_yield}"),
        });
      }
      Err(err) => {
        warn!(symbol, error = %err, "skipping symbol in income estimate");
        skipped.push(SymbolFailure {
          symbol: symbol.to_string(),
          reason: format!("{err:#}"),
        });
      }
    }
  }

  Ok(IncomeEstimate {
    annual_income: crate::quant::round_cents(income),
    skipped,
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use tracing_test::traced_test;

  use super::*;
  use crate::market::InMemoryMarketData;

  #[test]
  fn sums_weighted_yields() {
    let market = InMemoryMarketData::new()
      .with_dividend_yield("VTI", 0.015)
      .with_dividend_yield("BND", 0.03);
    let allocation: AssetAllocation = [("VTI", 0.6), ("BND", 0.4)].into_iter().collect();

    let estimate = estimate_annual_income(&allocation, 10_000.0, &market).unwrap();
    // 0.6 * 10k * 1.5% + 0.4 * 10k * 3%
    assert_abs_diff_eq!(estimate.annual_income, 210.0, epsilon = 1e-9);
    assert!(estimate.is_complete());
  }

  #[test]
  #[traced_test]
  fn missing_yield_is_reported_not_silent() {
    let market = InMemoryMarketData::new().with_dividend_yield("VTI", 0.02);
    let allocation: AssetAllocation = [("VTI", 0.5), ("GSG", 0.5)].into_iter().collect();

    let estimate = estimate_annual_income(&allocation, 1_000.0, &market).unwrap();
    assert_abs_diff_eq!(estimate.annual_income, 10.0, epsilon = 1e-9);
    assert_eq!(estimate.skipped.len(), 1);
    assert_eq!(estimate.skipped[0].symbol, "GSG");
    assert!(logs_contain("skipping symbol in income estimate"));
  }

  #[test]
  fn negative_amount_is_rejected() {
    let market = InMemoryMarketData::new();
    let allocation: AssetAllocation = [("VTI", 1.0)].into_iter().collect();
    let err = estimate_annual_income(&allocation, -1.0, &market).unwrap_err();
    assert_eq!(err.code(), "INVALID_PARAMETER");
  }
}
