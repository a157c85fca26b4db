//! # Portfolio Statistics
//!
//! $$
//! r^{p}_t = \sum_i w_i r_{i,t},\qquad
//! \mu_p = 252\,\bar r^{p},\qquad \sigma_p = \sqrt{252}\,s_{r^p}
//! $$
//!
//! Historical risk/return profile of a fixed allocation.

use serde::Deserialize;
use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::debug;

use super::income::IncomeEstimate;
use super::returns::MIN_ALIGNED_POINTS;
use super::returns::align_on_common_dates;
use super::types::AssetAllocation;
use crate::error::EngineError;
use crate::error::Result;
use crate::market::PriceSeries;
use crate::quant::TRADING_DAYS;
use crate::quant::round_cents;
use crate::quant::sharpe_ratio;
use crate::quant::simulation::max_drawdown;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
  pub expected_annual_return: f64,
  pub annual_volatility: f64,
  /// Excess return over the risk-free rate per unit of volatility.
  pub sharpe_ratio: f64,
  /// Worst peak-to-trough decline of the compounded path, as a magnitude.
  pub max_drawdown: f64,
  pub investment_amount: f64,
  /// Present when a dividend source was supplied.
  pub income: Option<IncomeEstimate>,
}

/// Statistics of `allocation` over the dates shared by `series`.
///
/// Every weighted symbol must have a series; a missing one is
/// [`EngineError::DataUnavailable`].
pub fn portfolio_stats(
  allocation: &AssetAllocation,
  series: &[PriceSeries],
  investment_amount: f64,
  risk_free: f64,
) -> Result<PortfolioStats> {
  allocation.validate()?;
  if !investment_amount.is_finite() || investment_amount <= 0.0 {
    return Err(EngineError::invalid_parameter(format!(
      "investment amount must be positive, got {investment_amount}"
    )));
  }

  let mut held = Vec::with_capacity(allocation.len());
  let mut weights = Vec::with_capacity(allocation.len());
  for (symbol, weight) in allocation.iter().filter(|(_, w)| *w > 0.0) {
    let found = series
      .iter()
      .find(|s| s.symbol() == symbol)
      .ok_or_else(|| EngineError::DataUnavailable {
        symbol: symbol.to_string(),
        reason: "no price history".into(),
      })?;
    held.push(found.clone());
    weights.push(weight);
  }

  let aligned = align_on_common_dates(&held);
  if aligned.dates.len() < MIN_ALIGNED_POINTS {
    return Err(EngineError::insufficient_history(
      allocation.symbols().join(","),
      MIN_ALIGNED_POINTS,
      aligned.dates.len(),
    ));
  }

  let per_asset = aligned.returns();
  let n_periods = aligned.dates.len() - 1;
  let daily: Vec<f64> = (0..n_periods)
    .map(|t| {
      weights
        .iter()
        .zip(per_asset.iter())
        .map(|(w, r)| w * r[t])
        .sum()
    })
    .collect();

  let expected_annual_return = daily.iter().mean() * TRADING_DAYS;
  let daily_std = if daily.len() > 1 {
    daily.iter().std_dev()
  } else {
    0.0
  };
  let annual_volatility = daily_std * TRADING_DAYS.sqrt();
  let sharpe = sharpe_ratio(expected_annual_return, annual_volatility, risk_free)?;

  let mut growth = Vec::with_capacity(daily.len() + 1);
  let mut value = investment_amount;
  growth.push(value);
  for r in &daily {
    value *= 1.0 + r;
    growth.push(value);
  }

  debug!(
    observations = aligned.dates.len(),
    expected_annual_return,
    annual_volatility,
    "portfolio statistics computed"
  );

  Ok(PortfolioStats {
    expected_annual_return,
    annual_volatility,
    sharpe_ratio: sharpe,
    max_drawdown: max_drawdown(&growth),
    investment_amount: round_cents(investment_amount),
    income: None,
  })
}
