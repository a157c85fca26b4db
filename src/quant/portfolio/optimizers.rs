//! # Portfolio Optimizers
//!
//! $$
//! \max_{\mathbf{w}\in\Delta} \frac{\mathbf{w}^\top\mu-r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! \qquad
//! \min_{\mathbf{w}\in\Delta} \mathbf{w}^\top\Sigma\mathbf{w} + \lambda(\mathbf{w}^\top\mu-r^\*)^2
//! $$
//!
//! Long-only, fully-invested solvers. Parameters live in an unconstrained
//! space and are mapped onto the simplex $\Delta$ by softmax, so every
//! candidate the solver evaluates already satisfies both constraints.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use argmin::solver::neldermead::NelderMead;
use nalgebra::DMatrix;
use nalgebra::DVector;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::error::EngineError;
use crate::error::Result;
use crate::quant::VOLATILITY_EPSILON;

/// Smallest seed weight mapped into parameter space (`ln` of zero is `-inf`).
const MIN_SEED_WEIGHT: f64 = 1e-6;

/// Factor applied to the return penalty after a solve misses its target.
pub const PENALTY_GROWTH: f64 = 100.0;

/// Solves attempted per target return, the first at `return_penalty`.
pub const PENALTY_ROUNDS: usize = 4;

/// Iteration and tolerance budget shared by all solves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
  /// Hard cap on Nelder-Mead iterations per solve.
  pub max_iters: u64,
  /// Convergence threshold on the standard deviation of simplex costs.
  pub sd_tolerance: f64,
  /// Initial weight of the squared return residual in frontier solves.
  pub return_penalty: f64,
  /// Largest accepted `|w . mu - target|` for a frontier point.
  pub return_tolerance: f64,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      max_iters: 10000,
      sd_tolerance: 1e-10,
      return_penalty: 1e4,
      return_tolerance: 1e-4,
    }
  }
}

/// Converged weights together with the raw solver parameters (reusable as a
/// warm start for a neighbouring problem).
#[derive(Clone, Debug)]
pub struct SolvedWeights {
  pub weights: Vec<f64>,
  pub params: Vec<f64>,
  pub iterations: u64,
}

pub(crate) fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

/// Inverse of [`softmax`] up to an additive constant.
pub(crate) fn logits(weights: &[f64]) -> Vec<f64> {
  weights
    .iter()
    .map(|&w| w.max(MIN_SEED_WEIGHT).ln())
    .collect()
}

/// `w . mu`.
pub fn portfolio_return(weights: &DVector<f64>, means: &DVector<f64>) -> f64 {
  weights.dot(means)
}

/// `sqrt(w' Sigma w)`, clamped at zero against round-off.
pub fn portfolio_volatility(weights: &DVector<f64>, covariance: &DMatrix<f64>) -> f64 {
  weights.dot(&(covariance * weights)).max(0.0).sqrt()
}

fn check_dimensions(means: &DVector<f64>, covariance: &DMatrix<f64>) -> Result<usize> {
  let n = means.len();
  if n == 0 {
    return Err(EngineError::invalid_parameter("cannot optimize an empty universe"));
  }
  if covariance.nrows() != n || covariance.ncols() != n {
    return Err(EngineError::invalid_parameter(format!(
      "covariance is {}x{} for {n} assets",
      covariance.nrows(),
      covariance.ncols()
    )));
  }
  Ok(n)
}

/// Build an n+1 vertex simplex around `x0`.
fn simplex_around(x0: &[f64]) -> Vec<Vec<f64>> {
  let mut simplex = Vec::with_capacity(x0.len() + 1);
  simplex.push(x0.to_vec());
  for i in 0..x0.len() {
    let mut point = x0.to_vec();
    point[i] += 1.0;
    simplex.push(point);
  }
  simplex
}

/// Run Nelder-Mead and insist on a converged termination.
fn solve<C>(cost: C, x0: Vec<f64>, config: &SolverConfig) -> Result<SolvedWeights>
where
  C: CostFunction<Param = Vec<f64>, Output = f64>,
{
  let solver = NelderMead::new(simplex_around(&x0))
    .with_sd_tolerance(config.sd_tolerance)
    .map_err(|err| EngineError::invalid_parameter(format!("solver setup: {err}")))?;

  let res = Executor::new(cost, solver)
    .configure(|state| state.max_iters(config.max_iters))
    .run()
    .map_err(|err| EngineError::OptimizationDidNotConverge {
      iterations: 0,
      reason: err.to_string(),
    })?;

  let iterations = res.state.iter;
  let converged = matches!(
    res.state.termination_status,
    TerminationStatus::Terminated(TerminationReason::SolverConverged)
  );
  debug!(
    iterations,
    best_cost = res.state.best_cost,
    status = ?res.state.termination_status,
    "nelder-mead finished"
  );

  if !converged {
    return Err(EngineError::OptimizationDidNotConverge {
      iterations,
      reason: format!("{:?}", res.state.termination_status),
    });
  }

  let params = res
    .state
    .best_param
    .ok_or_else(|| EngineError::OptimizationDidNotConverge {
      iterations,
      reason: "solver produced no parameters".into(),
    })?;

  Ok(SolvedWeights {
    weights: softmax(&params),
    params,
    iterations,
  })
}

/// Maximum-Sharpe long-only weights, seeded from `seed` (same order as `means`).
pub fn maximize_sharpe(
  means: &DVector<f64>,
  covariance: &DMatrix<f64>,
  risk_free: f64,
  seed: &[f64],
  config: &SolverConfig,
) -> Result<SolvedWeights> {
  let n = check_dimensions(means, covariance)?;
  if seed.len() != n {
    return Err(EngineError::invalid_parameter(format!(
      "seed has {} weights for {n} assets",
      seed.len()
    )));
  }

  struct SharpeCost {
    mu: DVector<f64>,
    cov: DMatrix<f64>,
    risk_free: f64,
  }

  impl CostFunction for SharpeCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
      let w = DVector::from_vec(softmax(x));
      let vol = portfolio_volatility(&w, &self.cov);
      if vol <= VOLATILITY_EPSILON {
        return Ok(1e10);
      }
      Ok(-(portfolio_return(&w, &self.mu) - self.risk_free) / vol)
    }
  }

  let cost = SharpeCost {
    mu: means.clone(),
    cov: covariance.clone(),
    risk_free,
  };

  solve(cost, logits(seed), config)
}

/// Minimum-variance long-only weights whose return matches `target_return`
/// within `config.return_tolerance`.
///
/// The return constraint is a quadratic penalty. When the solved point misses
/// the target, the penalty grows by [`PENALTY_GROWTH`] and the solve restarts
/// from the previous solution, at most [`PENALTY_ROUNDS`] times in total.
pub fn minimize_variance_for_return(
  means: &DVector<f64>,
  covariance: &DMatrix<f64>,
  target_return: f64,
  warm_start: Option<&[f64]>,
  config: &SolverConfig,
) -> Result<SolvedWeights> {
  let n = check_dimensions(means, covariance)?;

  struct TargetReturnCost {
    mu: DVector<f64>,
    cov: DMatrix<f64>,
    target_return: f64,
    penalty: f64,
  }

  impl CostFunction for TargetReturnCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
      let w = DVector::from_vec(softmax(x));
      let port_var = w.dot(&(&self.cov * &w));
      let ret_penalty = (portfolio_return(&w, &self.mu) - self.target_return).powi(2);

      Ok(port_var + self.penalty * ret_penalty)
    }
  }

  let mut x0 = match warm_start {
    Some(params) if params.len() == n => params.to_vec(),
    _ => vec![0.0; n],
  };
  let mut penalty = config.return_penalty;
  let mut iterations = 0;
  let mut residual = f64::INFINITY;

  for round in 0..PENALTY_ROUNDS {
    let cost = TargetReturnCost {
      mu: means.clone(),
      cov: covariance.clone(),
      target_return,
      penalty,
    };
    let mut solved = solve(cost, x0, config)?;
    iterations += solved.iterations;

    let realized = portfolio_return(&DVector::from_column_slice(&solved.weights), means);
    residual = (realized - target_return).abs();
    if residual <= config.return_tolerance {
      solved.iterations = iterations;
      return Ok(solved);
    }

    debug!(round, penalty, residual, target_return, "return residual above tolerance");
    x0 = solved.params;
    penalty *= PENALTY_GROWTH;
  }

  Err(EngineError::OptimizationDidNotConverge {
    iterations,
    reason: format!("return residual {residual:e} exceeds tolerance for target {target_return}"),
  })
}
