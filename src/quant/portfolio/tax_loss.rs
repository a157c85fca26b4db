//! # Tax-Loss Screening
//!
//! $$
//! L = (P_{\text{now}} - P_{\text{buy}})\,q,\qquad \text{report if } P_{\text{now}} < P_{\text{buy}} \wedge |L| > \tau
//! $$
//!
//! Heuristic screen for lots carrying a material unrealized loss. Not a tax
//! compliance check.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

/// Loss magnitude a lot must exceed to be reported.
pub const DEFAULT_LOSS_THRESHOLD: f64 = 1000.0;

/// One purchase lot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxLot {
  pub symbol: String,
  pub purchase_price: f64,
  pub shares: f64,
}

impl TaxLot {
  pub fn new(symbol: impl Into<String>, purchase_price: f64, shares: f64) -> Self {
    Self {
      symbol: symbol.into(),
      purchase_price,
      shares,
    }
  }

  /// `(current - purchase) * shares`.
  pub fn unrealized(&self, current_price: f64) -> f64 {
    (current_price - self.purchase_price) * self.shares
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxLossOpportunity {
  pub symbol: String,
  pub shares: f64,
  /// Negative for a loss.
  pub potential_loss: f64,
}

/// Lots priced strictly below cost with `|loss| > loss_threshold`, in input
/// order. Lots without a usable current price (missing, non-finite or not
/// positive) are skipped.
pub fn scan(
  lots: &[TaxLot],
  current_prices: &HashMap<String, f64>,
  loss_threshold: f64,
) -> Vec<TaxLossOpportunity> {
  lots
    .iter()
    .filter_map(|lot| {
      let price = *current_prices.get(&lot.symbol)?;
      if !price.is_finite() || price <= 0.0 || price >= lot.purchase_price {
        return None;
      }
      let loss = lot.unrealized(price);
      (loss.abs() > loss_threshold).then(|| TaxLossOpportunity {
        symbol: lot.symbol.clone(),
        shares: lot.shares,
        potential_loss: loss,
      })
    })
    .collect()
}

/// Sum of the reported losses (non-positive).
pub fn total_harvestable_loss(opportunities: &[TaxLossOpportunity]) -> f64 {
  opportunities.iter().map(|o| o.potential_loss).sum()
}
