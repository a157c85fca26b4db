//! # Efficient Frontier
//!
//! $$
//! \sigma^\*(r) = \min_{\mathbf{w}\in\Delta,\ \mathbf{w}^\top\mu=r} \sqrt{\mathbf{w}^\top\Sigma\mathbf{w}},
//! \qquad r \in [\min_i \mu_i,\ \max_i \mu_i]
//! $$
//!
//! Sweeps target returns and keeps the solved points that lie on the upper,
//! efficient branch.

use nalgebra::DVector;
use tracing::info;
use tracing::warn;

use super::optimizers::SolverConfig;
use super::optimizers::minimize_variance_for_return;
use super::optimizers::portfolio_return;
use super::optimizers::portfolio_volatility;
use super::returns::ReturnStatistics;
use super::types::AssetAllocation;
use super::types::FrontierPoint;
use crate::error::EngineError;
use crate::error::Result;
use crate::quant::sharpe_ratio;

/// Slack allowed when checking that volatility grows with return.
pub const VOLATILITY_SLACK: f64 = 1e-8;

/// `n` evenly spaced values over `[lo, hi]`.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
  match n {
    0 => Vec::new(),
    1 => vec![lo],
    _ => {
      let step = (hi - lo) / (n - 1) as f64;
      (0..n).map(|i| lo + step * i as f64).collect()
    }
  }
}

/// Solve the frontier at `n_points` targets between the lowest and highest
/// single-asset mean returns. Unsolved targets are dropped, so fewer than
/// `n_points` points may come back.
pub fn efficient_frontier(
  stats: &ReturnStatistics,
  n_points: usize,
  risk_free: f64,
  config: &SolverConfig,
) -> Result<Vec<FrontierPoint>> {
  if n_points == 0 {
    return Err(EngineError::invalid_parameter("frontier needs at least one point"));
  }
  if stats.is_empty() {
    return Err(EngineError::invalid_parameter("frontier over an empty universe"));
  }

  let means = stats.means();
  let covariance = stats.covariance();
  let lo = means.min();
  let hi = means.max();

  let mut solved: Vec<FrontierPoint> = Vec::with_capacity(n_points);

  // Every target starts cold from equal weights.
  for target in linspace(lo, hi, n_points) {
    let solution = match minimize_variance_for_return(means, covariance, target, None, config) {
      Ok(solution) => solution,
      Err(err) => {
        warn!(target_return = target, error = %err, "dropping unsolved frontier point");
        continue;
      }
    };

    let w = DVector::from_column_slice(&solution.weights);
    let expected_return = portfolio_return(&w, means);
    let volatility = portfolio_volatility(&w, covariance);
    let sharpe = match sharpe_ratio(expected_return, volatility, risk_free) {
      Ok(sharpe) => sharpe,
      Err(err) => {
        warn!(target_return = target, error = %err, "dropping degenerate frontier point");
        continue;
      }
    };

    solved.push(FrontierPoint {
      weights: AssetAllocation::from_weights(stats.symbols(), &solution.weights),
      target_return: target,
      expected_return,
      volatility,
      sharpe,
    });
  }

  let attempted = solved.len();
  let frontier = efficient_branch(solved);
  if frontier.len() < attempted {
    warn!(
      dropped = attempted - frontier.len(),
      "dropped frontier points below the efficient branch"
    );
  }
  info!(requested = n_points, kept = frontier.len(), "efficient frontier generated");

  Ok(frontier)
}

/// Keep the points whose volatility does not fall as target return rises.
///
/// Walking down from the highest target, a point survives only if it is no
/// riskier than the last survivor. This removes the inefficient lower branch
/// and isolated solver misses. Output is ordered by ascending target return.
pub fn efficient_branch(mut points: Vec<FrontierPoint>) -> Vec<FrontierPoint> {
  points.sort_by(|a, b| a.target_return.total_cmp(&b.target_return));

  let mut kept: Vec<FrontierPoint> = Vec::with_capacity(points.len());
  for point in points.into_iter().rev() {
    let accept = kept
      .last()
      .map_or(true, |last| point.volatility <= last.volatility + VOLATILITY_SLACK);
    if accept {
      kept.push(point);
    }
  }
  kept.reverse();
  kept
}
