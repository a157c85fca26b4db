//! # Portfolio Engine
//!
//! $$
//! \mathbf{w}^\* = \operatorname{Optimize}(\mu, \Sigma, \mathbf{w}^{(0)}_{\text{tier}})
//! $$
//!
//! High-level orchestration over an injected price provider: statistics,
//! tier-seeded max-Sharpe allocation, efficient frontier, portfolio stats and
//! historical simulation.

use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use super::frontier::efficient_frontier;
use super::income::estimate_annual_income;
use super::optimizers::SolverConfig;
use super::optimizers::maximize_sharpe;
use super::optimizers::portfolio_return;
use super::optimizers::portfolio_volatility;
use super::returns::ReturnStatistics;
use super::stats::PortfolioStats;
use super::stats::portfolio_stats;
use super::types::AllocationOutcome;
use super::types::AssetAllocation;
use super::types::FrontierPoint;
use super::types::PortfolioResult;
use super::types::RiskTier;
use super::universe::AssetUniverse;
use super::universe::RiskTemplates;
use crate::error::EngineError;
use crate::error::Result;
use crate::market::DividendYieldProvider;
use crate::market::Period;
use crate::market::PriceHistoryProvider;
use crate::market::fetch_all;
use crate::quant::sharpe_ratio;
use crate::quant::simulation::SimulationConfig;
use crate::quant::simulation::SimulationEngine;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEngineConfig {
  /// Instruments the optimizer allocates over.
  pub universe: AssetUniverse,
  /// Tier templates seeding the optimizer and backing the fallback.
  pub templates: RiskTemplates,
  /// Annual risk-free rate used in Sharpe computations.
  pub risk_free: f64,
  /// History window for return statistics.
  pub lookback: Period,
  /// History window for [`PortfolioEngine::portfolio_stats`].
  pub stats_lookback: Period,
  /// Default number of frontier targets.
  pub frontier_points: usize,
  pub solver: SolverConfig,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      universe: AssetUniverse::default(),
      templates: RiskTemplates::default(),
      risk_free: 0.02,
      lookback: Period::Years(5),
      stats_lookback: Period::Years(1),
      frontier_points: 100,
      solver: SolverConfig::default(),
    }
  }
}

/// Weights, return, volatility and Sharpe of `allocation` under `stats`.
pub fn evaluate(
  stats: &ReturnStatistics,
  allocation: &AssetAllocation,
  risk_free: f64,
) -> Result<PortfolioResult> {
  let w = nalgebra::DVector::from_vec(allocation.weights_for(stats.symbols()));
  let expected_return = portfolio_return(&w, stats.means());
  let volatility = portfolio_volatility(&w, stats.covariance());
  let sharpe = sharpe_ratio(expected_return, volatility, risk_free)?;

  Ok(PortfolioResult {
    weights: allocation.clone(),
    expected_return,
    volatility,
    sharpe,
  })
}

/// Single entry point for allocation design and evaluation.
#[derive(Clone, Debug)]
pub struct PortfolioEngine<P> {
  provider: P,
  config: PortfolioEngineConfig,
}

impl<P: PriceHistoryProvider> PortfolioEngine<P> {
  /// Construct a new engine with explicit configuration.
  pub fn new(provider: P, config: PortfolioEngineConfig) -> Self {
    Self { provider, config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  /// Statistics for arbitrary symbols.
  pub fn return_statistics(&self, symbols: &[String], period: Period) -> Result<ReturnStatistics> {
    ReturnStatistics::compute(&self.provider, symbols, period)
  }

  /// Statistics for the configured universe over the configured lookback.
  pub fn universe_statistics(&self) -> Result<ReturnStatistics> {
    self.return_statistics(&self.config.universe.symbols(), self.config.lookback)
  }

  /// Template allocation for `tier` over the full universe.
  pub fn seed_allocation(&self, tier: RiskTier) -> Result<AssetAllocation> {
    self
      .config
      .templates
      .seed_allocation(tier, &self.config.universe)
  }

  /// Template allocation restricted to the symbols `stats` covers.
  pub fn seed_for(&self, stats: &ReturnStatistics, tier: RiskTier) -> Result<AssetAllocation> {
    let seed = self.seed_allocation(tier)?;
    AssetAllocation::from_weights(stats.symbols(), &seed.weights_for(stats.symbols())).normalized()
  }

  /// Max-Sharpe allocation at the configured risk-free rate.
  pub fn maximize_sharpe(&self, tier: RiskTier) -> Result<PortfolioResult> {
    self.maximize_sharpe_with_rate(tier, self.config.risk_free)
  }

  pub fn maximize_sharpe_with_rate(&self, tier: RiskTier, risk_free: f64) -> Result<PortfolioResult> {
    let stats = self.universe_statistics()?;
    self.optimize_with_statistics(&stats, tier, risk_free)
  }

  /// Max-Sharpe solve over precomputed statistics.
  pub fn optimize_with_statistics(
    &self,
    stats: &ReturnStatistics,
    tier: RiskTier,
    risk_free: f64,
  ) -> Result<PortfolioResult> {
    let seed = self.seed_for(stats, tier)?;
    let solved = maximize_sharpe(
      stats.means(),
      stats.covariance(),
      risk_free,
      &seed.weights_for(stats.symbols()),
      &self.config.solver,
    )?;

    let weights = AssetAllocation::from_weights(stats.symbols(), &solved.weights);
    weights.validate()?;
    let result = evaluate(stats, &weights, risk_free)?;

    info!(
      %tier,
      iterations = solved.iterations,
      sharpe = result.sharpe,
      expected_return = result.expected_return,
      volatility = result.volatility,
      "max-sharpe allocation solved"
    );
    Ok(result)
  }

  /// Like [`PortfolioEngine::maximize_sharpe`], but a non-converged solve
  /// degrades to the tier template instead of failing.
  pub fn maximize_sharpe_or_fallback(&self, tier: RiskTier) -> Result<AllocationOutcome> {
    let stats = self.universe_statistics()?;
    match self.optimize_with_statistics(&stats, tier, self.config.risk_free) {
      Ok(result) => Ok(AllocationOutcome::Optimized(result)),
      Err(cause @ EngineError::OptimizationDidNotConverge { .. }) => {
        warn!(%tier, error = %cause, "falling back to template allocation");
        let seed = self.seed_for(&stats, tier)?;
        let result = evaluate(&stats, &seed, self.config.risk_free)?;
        Ok(AllocationOutcome::Fallback { result, cause })
      }
      Err(err) => Err(err),
    }
  }

  /// Frontier over the universe with `n_points` targets.
  pub fn efficient_frontier(&self, n_points: usize) -> Result<Vec<FrontierPoint>> {
    let stats = self.universe_statistics()?;
    efficient_frontier(&stats, n_points, self.config.risk_free, &self.config.solver)
  }

  /// Historical stats of `allocation` over the stats lookback, with an
  /// income estimate when `dividends` is given.
  pub fn portfolio_stats(
    &self,
    allocation: &AssetAllocation,
    investment_amount: f64,
    dividends: Option<&dyn DividendYieldProvider>,
  ) -> Result<PortfolioStats> {
    let symbols: Vec<String> = allocation
      .iter()
      .filter(|(_, w)| *w > 0.0)
      .map(|(s, _)| s.to_string())
      .collect();
    let report = fetch_all(&self.provider, &symbols, self.config.stats_lookback);
    if let Some(failure) = report.failures.first() {
      return Err(EngineError::DataUnavailable {
        symbol: failure.symbol.clone(),
        reason: failure.reason.clone(),
      });
    }

    let mut stats = portfolio_stats(
      allocation,
      &report.series,
      investment_amount,
      self.config.risk_free,
    )?;
    if let Some(dividends) = dividends {
      stats.income = Some(estimate_annual_income(allocation, investment_amount, dividends)?);
    }
    Ok(stats)
  }

  /// Simulation engine sharing this engine's provider.
  pub fn simulation(&self, config: SimulationConfig) -> SimulationEngine<&P> {
    SimulationEngine::new(&self.provider, config)
  }
}
