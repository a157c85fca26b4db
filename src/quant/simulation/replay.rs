//! # Replay
//!
//! $$
//! V_0 = B_0 = I,\qquad
//! V_t = (V_{t-1} + C_t)(1 + \mathbf{w}^\top \mathbf{r}_t),\qquad
//! B_t = (B_{t-1} + C_t)(1 + r^{b}_t)
//! $$
//!
//! Replays aligned daily returns for an allocation and a benchmark. `C_t` is
//! the monthly contribution on the first trading day of each new month and
//! zero otherwise; a backtest is the same replay with `C_t = 0`.

use chrono::Datelike;
use chrono::Days;
use chrono::NaiveDate;
use impl_new_derive::ImplNew;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use super::SimulationConfig;
use crate::error::EngineError;
use crate::error::Result;
use crate::market::Period;
use crate::market::PriceHistoryProvider;
use crate::market::fetch_all;
use crate::quant::portfolio::AlignedPrices;
use crate::quant::portfolio::AssetAllocation;
use crate::quant::portfolio::align_on_common_dates;
use crate::quant::round_cents;

/// Portfolio and benchmark value at the close of one trading day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationPoint {
  pub date: NaiveDate,
  pub portfolio_value: f64,
  pub benchmark_value: f64,
  /// Cash added to both legs before the day's return.
  pub contribution: f64,
}

/// A replayed path with the cash that went into it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
  pub points: Vec<SimulationPoint>,
  pub initial_investment: f64,
  pub total_contributions: f64,
}

impl SimulationRun {
  pub fn final_point(&self) -> Option<&SimulationPoint> {
    self.points.last()
  }

  pub fn portfolio_values(&self) -> Vec<f64> {
    self.points.iter().map(|p| p.portfolio_value).collect()
  }

  pub fn benchmark_values(&self) -> Vec<f64> {
    self.points.iter().map(|p| p.benchmark_value).collect()
  }
}

/// Inputs of one forward simulation.
#[derive(ImplNew, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
  pub allocation: AssetAllocation,
  pub initial_investment: f64,
  pub monthly_contribution: f64,
  pub horizon_years: u32,
  pub benchmark: String,
}

fn starts_new_month(previous: NaiveDate, current: NaiveDate) -> bool {
  (previous.year(), previous.month()) != (current.year(), current.month())
}

/// Replay `aligned` closes. `weights[i]` applies to `aligned.closes[i]` and
/// `benchmark` indexes the benchmark series. Values are rounded to cents on
/// output only.
pub fn replay_aligned(
  aligned: &AlignedPrices,
  weights: &[f64],
  benchmark: usize,
  initial_investment: f64,
  monthly_contribution: f64,
) -> Result<SimulationRun> {
  if weights.len() != aligned.closes.len() || benchmark >= aligned.closes.len() {
    return Err(EngineError::invalid_parameter(format!(
      "{} weights and benchmark index {benchmark} for {} series",
      weights.len(),
      aligned.closes.len()
    )));
  }
  let Some(&first_date) = aligned.dates.first() else {
    return Ok(SimulationRun {
      points: Vec::new(),
      initial_investment,
      total_contributions: 0.0,
    });
  };

  let mut portfolio = initial_investment;
  let mut bench = initial_investment;
  let mut total_contributions = 0.0;
  let mut points = Vec::with_capacity(aligned.dates.len());
  points.push(SimulationPoint {
    date: first_date,
    portfolio_value: round_cents(portfolio),
    benchmark_value: round_cents(bench),
    contribution: 0.0,
  });

  for t in 1..aligned.dates.len() {
    let date = aligned.dates[t];
    let contribution = if starts_new_month(aligned.dates[t - 1], date) {
      monthly_contribution
    } else {
      0.0
    };

    let port_ret: f64 = weights
      .iter()
      .zip(aligned.closes.iter())
      .map(|(w, closes)| w * (closes[t] / closes[t - 1] - 1.0))
      .sum();
    let bench_closes = &aligned.closes[benchmark];
    let bench_ret = bench_closes[t] / bench_closes[t - 1] - 1.0;

    portfolio = (portfolio + contribution) * (1.0 + port_ret);
    bench = (bench + contribution) * (1.0 + bench_ret);
    total_contributions += contribution;

    points.push(SimulationPoint {
      date,
      portfolio_value: round_cents(portfolio),
      benchmark_value: round_cents(bench),
      contribution,
    });
  }

  Ok(SimulationRun {
    points,
    initial_investment,
    total_contributions: round_cents(total_contributions),
  })
}

/// Replays allocations over provider history.
#[derive(Clone, Debug)]
pub struct SimulationEngine<P> {
  provider: P,
  config: SimulationConfig,
}

impl<P: PriceHistoryProvider> SimulationEngine<P> {
  pub fn new(provider: P, config: SimulationConfig) -> Self {
    Self { provider, config }
  }

  pub fn config(&self) -> &SimulationConfig {
    &self.config
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  /// Replay `allocation` over the last `horizon_years` with contributions.
  pub fn simulate(
    &self,
    allocation: &AssetAllocation,
    initial_investment: f64,
    monthly_contribution: f64,
    horizon_years: u32,
    benchmark: &str,
  ) -> Result<SimulationRun> {
    allocation.validate()?;
    if !initial_investment.is_finite() || initial_investment <= 0.0 {
      return Err(EngineError::invalid_parameter(format!(
        "initial investment must be positive, got {initial_investment}"
      )));
    }
    if !monthly_contribution.is_finite() || monthly_contribution < 0.0 {
      return Err(EngineError::invalid_parameter(format!(
        "monthly contribution must be non-negative, got {monthly_contribution}"
      )));
    }
    if horizon_years == 0 {
      return Err(EngineError::invalid_parameter("horizon must be at least one year"));
    }

    let mut symbols: Vec<String> = allocation
      .iter()
      .filter(|(_, w)| *w > 0.0)
      .map(|(s, _)| s.to_string())
      .collect();
    symbols.push(benchmark.to_string());

    let period = Period::Years(horizon_years);
    let report = fetch_all(&self.provider, &symbols, period);
    if let Some(failure) = report.failures.first() {
      return Err(EngineError::DataUnavailable {
        symbol: failure.symbol.clone(),
        reason: failure.reason.clone(),
      });
    }

    let aligned = align_on_common_dates(&report.series);
    let required = (f64::from(horizon_years) * self.config.trading_days).ceil() as usize;
    let latest_start = report
      .series
      .iter()
      .max_by_key(|s| s.first_date())
      .map(|s| s.symbol().to_string())
      .unwrap_or_else(|| benchmark.to_string());

    let (first, last) = match (aligned.dates.first(), aligned.dates.last()) {
      (Some(&first), Some(&last)) if aligned.dates.len() >= 2 => (first, last),
      _ => {
        return Err(EngineError::insufficient_history(
          latest_start,
          required,
          aligned.dates.len(),
        ))
      }
    };

    let grace = Days::new(u64::from(self.config.history_grace_days));
    let deadline = period
      .start_from(last)
      .and_then(|start| start.checked_add_days(grace))
      .ok_or_else(|| {
        EngineError::invalid_parameter(format!("horizon of {horizon_years}y is out of range"))
      })?;
    if first > deadline {
      return Err(EngineError::insufficient_history(
        latest_start,
        required,
        aligned.dates.len(),
      ));
    }

    let weights: Vec<f64> = report
      .series
      .iter()
      .map(|s| allocation.weight(s.symbol()))
      .collect();
    let benchmark_idx = report
      .series
      .iter()
      .position(|s| s.symbol() == benchmark)
      .ok_or_else(|| EngineError::DataUnavailable {
        symbol: benchmark.to_string(),
        reason: "benchmark missing from fetched series".into(),
      })?;

    debug!(
      symbols = report.series.len(),
      %first,
      %last,
      "replaying aligned history"
    );
    let run = replay_aligned(
      &aligned,
      &weights,
      benchmark_idx,
      initial_investment,
      monthly_contribution,
    )?;

    if let Some(end) = run.final_point() {
      info!(
        points = run.points.len(),
        portfolio_value = end.portfolio_value,
        benchmark_value = end.benchmark_value,
        total_contributions = run.total_contributions,
        "simulation finished"
      );
    }
    Ok(run)
  }

  /// Replay without contributions.
  pub fn backtest(
    &self,
    allocation: &AssetAllocation,
    initial_investment: f64,
    horizon_years: u32,
    benchmark: &str,
  ) -> Result<SimulationRun> {
    self.simulate(allocation, initial_investment, 0.0, horizon_years, benchmark)
  }

  pub fn run(&self, request: &SimulationRequest) -> Result<SimulationRun> {
    self.simulate(
      &request.allocation,
      request.initial_investment,
      request.monthly_contribution,
      request.horizon_years,
      &request.benchmark,
    )
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::market::InMemoryMarketData;

  fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()
  }

  fn wave(n: usize, base: f64, drift: f64, amp: f64) -> Vec<f64> {
    (0..n)
      .map(|i| {
        let t = i as f64;
        base * (1.0 + drift * t + amp * (t * 0.3).sin())
      })
      .collect()
  }

  fn market(n: usize) -> InMemoryMarketData {
    InMemoryMarketData::new()
      .with_closes("VTI", start(), &wave(n, 200.0, 0.0008, 0.02))
      .unwrap()
      .with_closes("BND", start(), &wave(n, 75.0, 0.0001, 0.004))
      .unwrap()
      .with_closes("SPY", start(), &wave(n, 400.0, 0.0007, 0.025))
      .unwrap()
  }

  fn allocation() -> AssetAllocation {
    [("VTI", 0.6), ("BND", 0.4)].into_iter().collect()
  }

  fn engine(n: usize) -> SimulationEngine<InMemoryMarketData> {
    SimulationEngine::new(market(n), SimulationConfig::default())
  }

  #[test]
  fn backtest_starts_at_initial_investment() {
    let run = engine(400).backtest(&allocation(), 10_000.0, 1, "SPY").unwrap();

    let first = &run.points[0];
    assert_eq!(first.portfolio_value, 10_000.0);
    assert_eq!(first.benchmark_value, 10_000.0);
    assert_eq!(run.total_contributions, 0.0);
    for pair in run.points.windows(2) {
      assert!(pair[0].date < pair[1].date);
    }
  }

  #[test]
  fn simulate_dominates_backtest_with_contributions() {
    let engine = engine(400);
    let sim = engine
      .simulate(&allocation(), 10_000.0, 500.0, 1, "SPY")
      .unwrap();
    let bt = engine.backtest(&allocation(), 10_000.0, 1, "SPY").unwrap();

    assert_eq!(sim.points.len(), bt.points.len());
    assert!(sim.total_contributions > 0.0);
    for (s, b) in sim.points.iter().zip(bt.points.iter()) {
      assert!(s.portfolio_value >= b.portfolio_value);
      assert!(s.benchmark_value >= b.benchmark_value);
    }
    assert!(sim.points.last().unwrap().portfolio_value > bt.points.last().unwrap().portfolio_value);
  }

  #[test]
  fn zero_contribution_matches_backtest() {
    let engine = engine(400);
    let sim = engine.simulate(&allocation(), 10_000.0, 0.0, 1, "SPY").unwrap();
    let bt = engine.backtest(&allocation(), 10_000.0, 1, "SPY").unwrap();
    assert_eq!(sim, bt);
  }

  #[test]
  fn contributions_land_on_first_trading_day_of_month() {
    let run = engine(400)
      .simulate(&allocation(), 10_000.0, 250.0, 1, "SPY")
      .unwrap();

    assert_eq!(run.points[0].contribution, 0.0);
    for pair in run.points.windows(2) {
      let new_month = pair[0].date.month() != pair[1].date.month();
      assert_eq!(pair[1].contribution > 0.0, new_month);
    }
    let months = run.points.iter().filter(|p| p.contribution > 0.0).count();
    assert_abs_diff_eq!(run.total_contributions, 250.0 * months as f64, epsilon = 1e-9);
  }

  #[test]
  fn benchmark_inside_allocation_is_supported() {
    let all_in: AssetAllocation = [("SPY", 1.0)].into_iter().collect();
    let run = engine(400).backtest(&all_in, 1_000.0, 1, "SPY").unwrap();
    for point in &run.points {
      assert_eq!(point.portfolio_value, point.benchmark_value);
    }
  }

  #[test]
  fn short_history_is_insufficient() {
    let err = engine(100)
      .backtest(&allocation(), 10_000.0, 1, "SPY")
      .unwrap_err();
    assert_eq!(err.code(), "INSUFFICIENT_HISTORY");
  }

  #[test]
  fn unknown_benchmark_is_data_unavailable() {
    let err = engine(400)
      .backtest(&allocation(), 10_000.0, 1, "QQQ")
      .unwrap_err();
    assert!(matches!(err, EngineError::DataUnavailable { ref symbol, .. } if symbol == "QQQ"));
  }

  #[test]
  fn invalid_inputs_are_rejected() {
    let engine = engine(400);
    let half: AssetAllocation = [("VTI", 0.5)].into_iter().collect();
    assert_eq!(
      engine.backtest(&half, 10_000.0, 1, "SPY").unwrap_err().code(),
      "INVALID_ALLOCATION"
    );
    assert_eq!(
      engine.backtest(&allocation(), 0.0, 1, "SPY").unwrap_err().code(),
      "INVALID_PARAMETER"
    );
    assert_eq!(
      engine
        .simulate(&allocation(), 1.0, -5.0, 1, "SPY")
        .unwrap_err()
        .code(),
      "INVALID_PARAMETER"
    );
    assert_eq!(
      engine.backtest(&allocation(), 1.0, 0, "SPY").unwrap_err().code(),
      "INVALID_PARAMETER"
    );
  }

  #[test]
  fn request_runs_like_simulate() {
    let engine = engine(400);
    let request = SimulationRequest::new(allocation(), 5_000.0, 100.0, 1, "SPY".to_string());
    assert_eq!(
      engine.run(&request).unwrap(),
      engine.simulate(&allocation(), 5_000.0, 100.0, 1, "SPY").unwrap()
    );
  }

  #[test]
  fn replay_rejects_mismatched_weights() {
    let aligned = AlignedPrices {
      dates: vec![start()],
      closes: vec![vec![1.0]],
    };
    assert!(replay_aligned(&aligned, &[0.5, 0.5], 0, 1.0, 0.0).is_err());
    assert!(replay_aligned(&aligned, &[1.0], 3, 1.0, 0.0).is_err());
  }
}
