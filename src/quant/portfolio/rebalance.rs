//! # Rebalancing
//!
//! $$
//! \Delta_i = w_i^{\text{target}} - w_i^{\text{current}},\qquad
//! \text{emit } i \iff |\Delta_i| > \tau
//! $$
//!
//! Sizes the weight changes needed to move a portfolio onto its target.
//! Nothing here executes trades.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

use super::types::AssetAllocation;
use crate::error::EngineError;
use crate::error::Result;

/// Materiality threshold most callers use. It is never applied implicitly.
pub const DEFAULT_REBALANCE_THRESHOLD: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
  Buy,
  Sell,
}

impl Display for TradeSide {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TradeSide::Buy => f.write_str("buy"),
      TradeSide::Sell => f.write_str("sell"),
    }
  }
}

/// Signed weight change for one symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
  pub symbol: String,
  /// Positive buys, negative sells.
  pub delta: f64,
  pub side: TradeSide,
}

impl Trade {
  pub fn new(symbol: impl Into<String>, delta: f64) -> Self {
    let side = if delta >= 0.0 {
      TradeSide::Buy
    } else {
      TradeSide::Sell
    };
    Self {
      symbol: symbol.into(),
      delta,
      side,
    }
  }

  /// Cash amount of the trade for a portfolio worth `portfolio_value`.
  pub fn notional(&self, portfolio_value: f64) -> f64 {
    self.delta.abs() * portfolio_value
  }
}

fn check_threshold(threshold: f64) -> Result<()> {
  if !threshold.is_finite() || threshold < 0.0 {
    return Err(EngineError::invalid_parameter(format!(
      "rebalance threshold must be finite and non-negative, got {threshold}"
    )));
  }
  Ok(())
}

/// Material deltas `target - current`, keyed by symbol.
///
/// Symbols held but missing from `target` are treated as a zero target.
pub fn diff(
  current: &AssetAllocation,
  target: &AssetAllocation,
  threshold: f64,
) -> Result<BTreeMap<String, f64>> {
  check_threshold(threshold)?;

  let mut deltas = BTreeMap::new();
  for (symbol, target_weight) in target.iter() {
    let delta = target_weight - current.weight(symbol);
    if delta.abs() > threshold {
      deltas.insert(symbol.to_string(), delta);
    }
  }
  for (symbol, current_weight) in current.iter() {
    if !target.contains(symbol) && current_weight.abs() > threshold {
      deltas.insert(symbol.to_string(), -current_weight);
    }
  }

  Ok(deltas)
}

/// Same as [`diff`] but as an ordered list of trades.
pub fn trades(
  current: &AssetAllocation,
  target: &AssetAllocation,
  threshold: f64,
) -> Result<Vec<Trade>> {
  Ok(
    diff(current, target, threshold)?
      .into_iter()
      .map(|(symbol, delta)| Trade::new(symbol, delta))
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn alloc(pairs: &[(&str, f64)]) -> AssetAllocation {
    pairs.iter().copied().collect()
  }

  #[test]
  fn moves_both_legs_past_threshold() {
    let current = alloc(&[("VTI", 0.5), ("BND", 0.5)]);
    let target = alloc(&[("VTI", 0.6), ("BND", 0.4)]);

    let deltas = diff(&current, &target, 0.05).unwrap();
    assert_eq!(deltas.len(), 2);
    assert_abs_diff_eq!(deltas["VTI"], 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(deltas["BND"], -0.1, epsilon = 1e-12);
  }

  #[test]
  fn immaterial_drift_is_omitted() {
    let current = alloc(&[("VTI", 0.58), ("BND", 0.42)]);
    let target = alloc(&[("VTI", 0.6), ("BND", 0.4)]);

    let deltas = diff(&current, &target, DEFAULT_REBALANCE_THRESHOLD).unwrap();
    assert!(deltas.is_empty());

    let tight = diff(&current, &target, 0.01).unwrap();
    assert_eq!(tight.len(), 2);
  }

  #[test]
  fn dropped_holding_is_sold() {
    let current = alloc(&[("VTI", 0.4), ("BND", 0.4), ("GSG", 0.2)]);
    let target = alloc(&[("VTI", 0.5), ("BND", 0.5)]);

    let trades = trades(&current, &target, 0.05).unwrap();
    let gsg = trades.iter().find(|t| t.symbol == "GSG").unwrap();
    assert_abs_diff_eq!(gsg.delta, -0.2, epsilon = 1e-12);
    assert_eq!(gsg.side, TradeSide::Sell);
  }

  #[test]
  fn new_symbol_is_bought() {
    let current = alloc(&[("VTI", 1.0)]);
    let target = alloc(&[("VTI", 0.7), ("VNQ", 0.3)]);

    let trades = trades(&current, &target, 0.05).unwrap();
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].symbol, "VNQ");
    assert_eq!(trades[0].side, TradeSide::Buy);
    assert_abs_diff_eq!(trades[0].notional(10_000.0), 3_000.0, epsilon = 1e-9);
  }

  #[test]
  fn every_entry_exceeds_threshold_and_omissions_do_not() {
    let current = alloc(&[("A", 0.1), ("B", 0.2), ("C", 0.3), ("D", 0.4)]);
    let target = alloc(&[("A", 0.13), ("B", 0.3), ("C", 0.27), ("E", 0.3)]);
    let threshold = 0.05;

    let deltas = diff(&current, &target, threshold).unwrap();
    for delta in deltas.values() {
      assert!(delta.abs() > threshold);
    }
    for symbol in ["A", "B", "C", "D", "E"] {
      if !deltas.contains_key(symbol) {
        assert!((target.weight(symbol) - current.weight(symbol)).abs() <= threshold);
      }
    }
    assert!(deltas.contains_key("D"));
    assert!(deltas.contains_key("E"));
  }

  #[test]
  fn diff_is_idempotent() {
    let current = alloc(&[("VTI", 0.5), ("BND", 0.5)]);
    let target = alloc(&[("VTI", 0.6), ("BND", 0.4)]);
    assert_eq!(
      diff(&current, &target, 0.05).unwrap(),
      diff(&current, &target, 0.05).unwrap()
    );
  }

  #[test]
  fn bad_threshold_is_rejected() {
    let a = alloc(&[("VTI", 1.0)]);
    for threshold in [-0.01, f64::NAN, f64::INFINITY] {
      assert_eq!(diff(&a, &a, threshold).unwrap_err().code(), "INVALID_PARAMETER");
    }
  }
}
