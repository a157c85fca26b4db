//! # Quant
//!
//! $$
//! S = \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Allocation design (statistics, optimizers, frontier), allocation
//! maintenance (rebalancing, tax-loss screening) and historical evaluation
//! (simulation, scenario metrics).

pub mod portfolio;
pub mod risk_profile;
pub mod simulation;

use crate::error::EngineError;
use crate::error::Result;

/// Trading days per year used to annualize daily statistics.
pub const TRADING_DAYS: f64 = 252.0;

/// Volatilities at or below this are treated as zero.
pub const VOLATILITY_EPSILON: f64 = 1e-12;

/// `(expected_return - risk_free) / volatility`, refusing degenerate volatility.
pub fn sharpe_ratio(expected_return: f64, volatility: f64, risk_free: f64) -> Result<f64> {
  if !volatility.is_finite() || volatility <= VOLATILITY_EPSILON {
    return Err(EngineError::UndefinedSharpeRatio { volatility });
  }
  Ok((expected_return - risk_free) / volatility)
}

/// Round a currency amount to cents.
pub(crate) fn round_cents(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}
