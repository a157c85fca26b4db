//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Shared enums and result containers for portfolio optimization.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::EngineError;
use crate::error::Result;

/// Investor risk tier used to pick an allocation template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
  Conservative,
  ModerateConservative,
  Moderate,
  ModerateAggressive,
  Aggressive,
}

impl RiskTier {
  /// Every tier, from least to most aggressive.
  pub const ALL: [RiskTier; 5] = [
    RiskTier::Conservative,
    RiskTier::ModerateConservative,
    RiskTier::Moderate,
    RiskTier::ModerateAggressive,
    RiskTier::Aggressive,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      RiskTier::Conservative => "conservative",
      RiskTier::ModerateConservative => "moderate_conservative",
      RiskTier::Moderate => "moderate",
      RiskTier::ModerateAggressive => "moderate_aggressive",
      RiskTier::Aggressive => "aggressive",
    }
  }
}

impl Display for RiskTier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RiskTier {
  type Err = EngineError;

  /// Accepts `snake_case` or `kebab-case` keys; anything else is rejected.
  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    let key = s.trim().to_lowercase().replace('-', "_");
    RiskTier::ALL
      .into_iter()
      .find(|tier| tier.as_str() == key)
      .ok_or_else(|| EngineError::InvalidRiskLevel(s.to_string()))
  }
}

/// Mapping symbol -> portfolio weight.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetAllocation(BTreeMap<String, f64>);

impl AssetAllocation {
  /// Tolerance on the sum-to-one constraint.
  pub const TOLERANCE: f64 = 1e-6;

  pub fn new() -> Self {
    Self::default()
  }

  /// Pair `symbols[i]` with `weights[i]`.
  pub fn from_weights(symbols: &[String], weights: &[f64]) -> Self {
    symbols
      .iter()
      .cloned()
      .zip(weights.iter().copied())
      .collect()
  }

  pub fn insert(&mut self, symbol: impl Into<String>, weight: f64) -> Option<f64> {
    self.0.insert(symbol.into(), weight)
  }

  pub fn get(&self, symbol: &str) -> Option<f64> {
    self.0.get(symbol).copied()
  }

  /// Weight of `symbol`, zero when absent.
  pub fn weight(&self, symbol: &str) -> f64 {
    self.get(symbol).unwrap_or(0.0)
  }

  pub fn contains(&self, symbol: &str) -> bool {
    self.0.contains_key(symbol)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.0.iter().map(|(s, w)| (s.as_str(), *w))
  }

  pub fn symbols(&self) -> Vec<String> {
    self.0.keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn total(&self) -> f64 {
    self.0.values().sum()
  }

  /// Weights in the order of `symbols`, zero for missing ones.
  pub fn weights_for(&self, symbols: &[String]) -> Vec<f64> {
    symbols.iter().map(|s| self.weight(s)).collect()
  }

  /// Scale weights to sum to one.
  pub fn normalized(&self) -> Result<Self> {
    let total = self.total();
    if !(total.is_finite() && total > 0.0) {
      return Err(EngineError::InvalidAllocation(format!(
        "cannot normalize weights summing to {total}"
      )));
    }
    Ok(self.iter().map(|(s, w)| (s.to_string(), w / total)).collect())
  }

  /// Strict long-only, fully-invested check.
  pub fn validate(&self) -> Result<()> {
    if self.is_empty() {
      return Err(EngineError::InvalidAllocation("allocation is empty".into()));
    }
    for (symbol, weight) in self.iter() {
      if !weight.is_finite() || weight < 0.0 || weight > 1.0 + Self::TOLERANCE {
        return Err(EngineError::InvalidAllocation(format!(
          "weight {weight} for {symbol} is outside [0, 1]"
        )));
      }
    }
    let total = self.total();
    if (total - 1.0).abs() > Self::TOLERANCE {
      return Err(EngineError::InvalidAllocation(format!(
        "weights sum to {total}, expected 1"
      )));
    }
    Ok(())
  }
}

impl FromIterator<(String, f64)> for AssetAllocation {
  fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a> FromIterator<(&'a str, f64)> for AssetAllocation {
  fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
    Self(iter.into_iter().map(|(s, w)| (s.to_string(), w)).collect())
  }
}

impl From<BTreeMap<String, f64>> for AssetAllocation {
  fn from(map: BTreeMap<String, f64>) -> Self {
    Self(map)
  }
}

impl From<HashMap<String, f64>> for AssetAllocation {
  fn from(map: HashMap<String, f64>) -> Self {
    Self(map.into_iter().collect())
  }
}

/// Output of a portfolio optimization run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioResult {
  /// Final portfolio weights.
  pub weights: AssetAllocation,
  /// Model expected portfolio return (annualized).
  pub expected_return: f64,
  /// Model portfolio volatility (annualized).
  pub volatility: f64,
  /// Sharpe ratio computed as `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
}

/// One solved point on the efficient frontier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
  pub weights: AssetAllocation,
  /// Return the solve was constrained to.
  pub target_return: f64,
  /// Realized `w . mu`, within the solver's return tolerance of the target.
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe: f64,
}

/// Max-Sharpe result, or the template seed when the solver gave up.
#[derive(Debug)]
pub enum AllocationOutcome {
  Optimized(PortfolioResult),
  /// Degraded: the heuristic seed evaluated against the same statistics.
  Fallback {
    result: PortfolioResult,
    cause: EngineError,
  },
}

impl AllocationOutcome {
  pub fn result(&self) -> &PortfolioResult {
    match self {
      AllocationOutcome::Optimized(result) => result,
      AllocationOutcome::Fallback { result, .. } => result,
    }
  }

  pub fn into_result(self) -> PortfolioResult {
    match self {
      AllocationOutcome::Optimized(result) => result,
      AllocationOutcome::Fallback { result, .. } => result,
    }
  }

  pub fn is_degraded(&self) -> bool {
    matches!(self, AllocationOutcome::Fallback { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn risk_tier_parses_known_keys_only() {
    assert_eq!("moderate".parse::<RiskTier>().unwrap(), RiskTier::Moderate);
    assert_eq!(
      "Moderate-Aggressive".parse::<RiskTier>().unwrap(),
      RiskTier::ModerateAggressive
    );
    let err = "reckless".parse::<RiskTier>().unwrap_err();
    assert_eq!(err.code(), "INVALID_RISK_LEVEL");
  }

  #[test]
  fn risk_tier_serializes_as_snake_case() {
    let json = serde_json::to_string(&RiskTier::ModerateConservative).unwrap();
    assert_eq!(json, "\"moderate_conservative\"");
  }

  #[test]
  fn validate_accepts_fully_invested_long_only() {
    let allocation: AssetAllocation = [("VTI", 0.6), ("BND", 0.4)].into_iter().collect();
    assert!(allocation.validate().is_ok());
  }

  #[test]
  fn validate_rejects_bad_sum_and_shorts() {
    let under: AssetAllocation = [("VTI", 0.5), ("BND", 0.4)].into_iter().collect();
    let short: AssetAllocation = [("VTI", 1.2), ("BND", -0.2)].into_iter().collect();
    let empty = AssetAllocation::new();

    for allocation in [under, short, empty] {
      assert_eq!(allocation.validate().unwrap_err().code(), "INVALID_ALLOCATION");
    }
  }

  #[test]
  fn normalized_rescales() {
    let allocation: AssetAllocation = [("VTI", 2.0), ("BND", 2.0)].into_iter().collect();
    let normalized = allocation.normalized().unwrap();
    assert_eq!(normalized.weight("VTI"), 0.5);
    assert_eq!(normalized.weight("GSG"), 0.0);
    assert!(AssetAllocation::new().normalized().is_err());
  }

  #[test]
  fn outcome_reports_degradation() {
    let outcome = AllocationOutcome::Fallback {
      result: PortfolioResult::default(),
      cause: EngineError::OptimizationDidNotConverge {
        iterations: 5000,
        reason: "max iterations".into(),
      },
    };
    assert!(outcome.is_degraded());
    assert!(!AllocationOutcome::Optimized(PortfolioResult::default()).is_degraded());
  }
}
