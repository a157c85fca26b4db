//! # Scenario Metrics
//!
//! $$
//! R_{\text{ann}} = (1+\bar r)^{252} - 1,\qquad
//! \sigma_{\text{ann}} = s_r\sqrt{252},\qquad
//! DD_t = \frac{V_t}{\max_{s\le t} V_s} - 1
//! $$
//!
//! Summary statistics of a replayed path.

use serde::Deserialize;
use serde::Serialize;
use statrs::statistics::Statistics;

use super::replay::SimulationPoint;
use super::replay::SimulationRun;
use crate::error::EngineError;
use crate::error::Result;
use crate::quant::TRADING_DAYS;
use crate::quant::sharpe_ratio;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
  /// `(final - initial) / initial`, contributions included in the final value.
  pub total_return: f64,
  pub annualized_return: f64,
  pub annualized_volatility: f64,
  pub sharpe_ratio: f64,
  /// Largest peak-to-trough decline as a non-negative fraction.
  pub max_drawdown: f64,
  /// Signed drawdown per point, each `<= 0`.
  pub drawdown_series: Vec<f64>,
  pub benchmark_total_return: f64,
  /// `total_return - benchmark_total_return`.
  pub excess_return: f64,
  pub points: Vec<SimulationPoint>,
}

/// Signed decline of each value from its running peak.
pub fn drawdown_series(values: &[f64]) -> Vec<f64> {
  let mut peak = f64::NEG_INFINITY;
  values
    .iter()
    .map(|&v| {
      peak = peak.max(v);
      if peak > 0.0 { v / peak - 1.0 } else { 0.0 }
    })
    .collect()
}

/// Magnitude of the worst drawdown, `0` for an empty or rising series.
pub fn max_drawdown(values: &[f64]) -> f64 {
  drawdown_series(values)
    .into_iter()
    .fold(0.0_f64, |worst, dd| worst.max(-dd))
}

/// Daily returns net of the cash added on each day.
fn flow_adjusted_returns(points: &[SimulationPoint], value: impl Fn(&SimulationPoint) -> f64) -> Vec<f64> {
  points
    .windows(2)
    .map(|w| value(&w[1]) / (value(&w[0]) + w[1].contribution) - 1.0)
    .collect()
}

/// Derives [`ScenarioMetrics`] from a [`SimulationRun`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAnalyzer {
  pub trading_days: f64,
  /// Subtracted from the annualized return in the Sharpe ratio.
  pub risk_free: f64,
}

impl Default for ScenarioAnalyzer {
  fn default() -> Self {
    Self {
      trading_days: TRADING_DAYS,
      risk_free: 0.0,
    }
  }
}

impl ScenarioAnalyzer {
  pub fn new(trading_days: f64, risk_free: f64) -> Self {
    Self {
      trading_days,
      risk_free,
    }
  }

  pub fn analyze(&self, run: &SimulationRun) -> Result<ScenarioMetrics> {
    let points = &run.points;
    if points.len() < 2 {
      return Err(EngineError::insufficient_history("portfolio", 2, points.len()));
    }
    let initial = run.initial_investment;
    if !initial.is_finite() || initial <= 0.0 {
      return Err(EngineError::invalid_parameter(format!(
        "initial investment must be positive, got {initial}"
      )));
    }

    let values = run.portfolio_values();
    let final_value = values[values.len() - 1];
    let total_return = (final_value - initial) / initial;
    let benchmark_final = points[points.len() - 1].benchmark_value;
    let benchmark_total_return = (benchmark_final - initial) / initial;

    let returns = flow_adjusted_returns(points, |p| p.portfolio_value);
    let mean_daily = returns.iter().mean();
    let std_daily = if returns.len() > 1 {
      returns.iter().std_dev()
    } else {
      0.0
    };

    let annualized_return = (1.0 + mean_daily).powf(self.trading_days) - 1.0;
    let annualized_volatility = std_daily * self.trading_days.sqrt();
    let sharpe = sharpe_ratio(annualized_return, annualized_volatility, self.risk_free)?;

    let drawdowns = drawdown_series(&values);
    let max_dd = drawdowns.iter().fold(0.0_f64, |worst, dd| worst.max(-dd));

    Ok(ScenarioMetrics {
      total_return,
      annualized_return,
      annualized_volatility,
      sharpe_ratio: sharpe,
      max_drawdown: max_dd,
      drawdown_series: drawdowns,
      benchmark_total_return,
      excess_return: total_return - benchmark_total_return,
      points: points.clone(),
    })
  }
}
