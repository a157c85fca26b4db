//! # Universe
//!
//! $$
//! w_i^{(0)} = s_{g(i)}(\text{tier}) \cdot \rho_i
//! $$
//!
//! Asset-class universe and risk-tier templates. The seed weight of an asset
//! is its group share for the tier (stocks/bonds/alternatives) times its
//! regional share inside the group.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use super::types::AssetAllocation;
use super::types::RiskTier;
use crate::error::EngineError;
use crate::error::Result;

/// Broad allocation bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetGroup {
  Stocks,
  Bonds,
  Alternatives,
}

/// Asset class with a representative instrument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
  UsStocks,
  IntlStocks,
  UsBonds,
  IntlBonds,
  RealEstate,
  Commodities,
}

impl AssetClass {
  pub fn group(&self) -> AssetGroup {
    match self {
      AssetClass::UsStocks | AssetClass::IntlStocks => AssetGroup::Stocks,
      AssetClass::UsBonds | AssetClass::IntlBonds => AssetGroup::Bonds,
      AssetClass::RealEstate | AssetClass::Commodities => AssetGroup::Alternatives,
    }
  }
}

/// One instrument in the universe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseAsset {
  pub class: AssetClass,
  pub symbol: String,
}

/// Ordered set of instruments the engine allocates over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUniverse {
  assets: Vec<UniverseAsset>,
}

impl Default for AssetUniverse {
  fn default() -> Self {
    Self::new(vec![
      (AssetClass::UsStocks, "VTI"),
      (AssetClass::IntlStocks, "VXUS"),
      (AssetClass::UsBonds, "BND"),
      (AssetClass::IntlBonds, "BNDX"),
      (AssetClass::RealEstate, "VNQ"),
      (AssetClass::Commodities, "GSG"),
    ])
  }
}

impl AssetUniverse {
  pub fn new(assets: Vec<(AssetClass, &str)>) -> Self {
    Self {
      assets: assets
        .into_iter()
        .map(|(class, symbol)| UniverseAsset {
          class,
          symbol: symbol.to_string(),
        })
        .collect(),
    }
  }

  pub fn assets(&self) -> &[UniverseAsset] {
    &self.assets
  }

  pub fn symbols(&self) -> Vec<String> {
    self.assets.iter().map(|a| a.symbol.clone()).collect()
  }

  pub fn symbol_for(&self, class: AssetClass) -> Option<&str> {
    self
      .assets
      .iter()
      .find(|a| a.class == class)
      .map(|a| a.symbol.as_str())
  }

  pub fn class_of(&self, symbol: &str) -> Option<AssetClass> {
    self
      .assets
      .iter()
      .find(|a| a.symbol == symbol)
      .map(|a| a.class)
  }
}

/// Group shares for one tier. Must sum to one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierSplit {
  pub stocks: f64,
  pub bonds: f64,
  pub alternatives: f64,
}

impl TierSplit {
  pub fn new(stocks: f64, bonds: f64, alternatives: f64) -> Self {
    Self {
      stocks,
      bonds,
      alternatives,
    }
  }

  pub fn share(&self, group: AssetGroup) -> f64 {
    match group {
      AssetGroup::Stocks => self.stocks,
      AssetGroup::Bonds => self.bonds,
      AssetGroup::Alternatives => self.alternatives,
    }
  }
}

/// Regional split inside each group.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSplit {
  /// Share of stocks held in US equity; the rest is international.
  pub us_stocks: f64,
  /// Share of bonds held in US bonds; the rest is international.
  pub us_bonds: f64,
  /// Share of alternatives held in real estate; the rest is commodities.
  pub real_estate: f64,
}

impl Default for RegionSplit {
  fn default() -> Self {
    Self {
      us_stocks: 0.6,
      us_bonds: 0.7,
      real_estate: 0.5,
    }
  }
}

impl RegionSplit {
  pub fn share(&self, class: AssetClass) -> f64 {
    match class {
      AssetClass::UsStocks => self.us_stocks,
      AssetClass::IntlStocks => 1.0 - self.us_stocks,
      AssetClass::UsBonds => self.us_bonds,
      AssetClass::IntlBonds => 1.0 - self.us_bonds,
      AssetClass::RealEstate => self.real_estate,
      AssetClass::Commodities => 1.0 - self.real_estate,
    }
  }
}

/// Risk-tier templates used to seed the optimizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskTemplates {
  pub tiers: BTreeMap<RiskTier, TierSplit>,
  pub regions: RegionSplit,
}

impl Default for RiskTemplates {
  fn default() -> Self {
    let tiers = BTreeMap::from([
      (RiskTier::Conservative, TierSplit::new(0.30, 0.60, 0.10)),
      (RiskTier::ModerateConservative, TierSplit::new(0.50, 0.40, 0.10)),
      (RiskTier::Moderate, TierSplit::new(0.60, 0.30, 0.10)),
      (RiskTier::ModerateAggressive, TierSplit::new(0.70, 0.20, 0.10)),
      (RiskTier::Aggressive, TierSplit::new(0.80, 0.10, 0.10)),
    ]);
    Self {
      tiers,
      regions: RegionSplit::default(),
    }
  }
}

impl RiskTemplates {
  pub fn split(&self, tier: RiskTier) -> Result<&TierSplit> {
    self
      .tiers
      .get(&tier)
      .ok_or_else(|| EngineError::InvalidRiskLevel(tier.to_string()))
  }

  /// Template weight of one asset class for `tier`.
  pub fn class_weight(&self, tier: RiskTier, class: AssetClass) -> Result<f64> {
    Ok(self.split(tier)?.share(class.group()) * self.regions.share(class))
  }

  /// Seed allocation over `universe`, renormalized when the universe does
  /// not cover every class.
  pub fn seed_allocation(&self, tier: RiskTier, universe: &AssetUniverse) -> Result<AssetAllocation> {
    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    for asset in universe.assets() {
      let weight = self.class_weight(tier, asset.class)?;
      *weights.entry(asset.symbol.clone()).or_insert(0.0) += weight;
    }
    AssetAllocation::from(weights).normalized()
  }

  /// Check every split and regional share.
  pub fn validate(&self) -> Result<()> {
    for (tier, split) in &self.tiers {
      let parts = [split.stocks, split.bonds, split.alternatives];
      if parts.iter().any(|p| !(0.0..=1.0).contains(p)) {
        return Err(EngineError::InvalidAllocation(format!(
          "{tier} template has a share outside [0, 1]"
        )));
      }
      let total: f64 = parts.iter().sum();
      if (total - 1.0).abs() > AssetAllocation::TOLERANCE {
        return Err(EngineError::InvalidAllocation(format!(
          "{tier} template sums to {total}"
        )));
      }
    }
    let regions = [self.regions.us_stocks, self.regions.us_bonds, self.regions.real_estate];
    if regions.iter().any(|r| !(0.0..=1.0).contains(r)) {
      return Err(EngineError::InvalidAllocation(
        "regional shares must lie in [0, 1]".into(),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  #[test]
  fn default_templates_are_valid() {
    assert!(RiskTemplates::default().validate().is_ok());
  }

  #[test]
  fn conservative_seed_matches_template() {
    let seed = RiskTemplates::default()
      .seed_allocation(RiskTier::Conservative, &AssetUniverse::default())
      .unwrap();

    assert_abs_diff_eq!(seed.weight("VTI"), 0.18, epsilon = 1e-12);
    assert_abs_diff_eq!(seed.weight("VXUS"), 0.12, epsilon = 1e-12);
    assert_abs_diff_eq!(seed.weight("BND"), 0.42, epsilon = 1e-12);
    assert_abs_diff_eq!(seed.weight("BNDX"), 0.18, epsilon = 1e-12);
    assert_abs_diff_eq!(seed.weight("VNQ"), 0.05, epsilon = 1e-12);
    assert_abs_diff_eq!(seed.weight("GSG"), 0.05, epsilon = 1e-12);
    assert!(seed.validate().is_ok());
  }

  #[test]
  fn aggressive_seed_weights_us_stocks() {
    let seed = RiskTemplates::default()
      .seed_allocation(RiskTier::Aggressive, &AssetUniverse::default())
      .unwrap();
    assert_abs_diff_eq!(seed.weight("VTI"), 0.48, epsilon = 1e-12);
  }

  #[test]
  fn partial_universe_is_renormalized() {
    let universe = AssetUniverse::new(vec![
      (AssetClass::UsStocks, "VTI"),
      (AssetClass::UsBonds, "BND"),
    ]);
    let seed = RiskTemplates::default()
      .seed_allocation(RiskTier::Moderate, &universe)
      .unwrap();

    // 0.36 and 0.21 rescaled to sum to one.
    assert_abs_diff_eq!(seed.weight("VTI"), 0.36 / 0.57, epsilon = 1e-12);
    assert_abs_diff_eq!(seed.total(), 1.0, epsilon = 1e-12);
  }

  #[test]
  fn missing_tier_is_invalid_risk_level() {
    let mut templates = RiskTemplates::default();
    templates.tiers.remove(&RiskTier::Aggressive);
    let err = templates
      .seed_allocation(RiskTier::Aggressive, &AssetUniverse::default())
      .unwrap_err();
    assert_eq!(err.code(), "INVALID_RISK_LEVEL");
  }

  #[test]
  fn broken_template_fails_validation() {
    let mut templates = RiskTemplates::default();
    templates
      .tiers
      .insert(RiskTier::Moderate, TierSplit::new(0.7, 0.3, 0.1));
    assert!(templates.validate().is_err());
  }

  #[test]
  fn universe_lookups() {
    let universe = AssetUniverse::default();
    assert_eq!(universe.symbol_for(AssetClass::UsStocks), Some("VTI"));
    assert_eq!(universe.class_of("GSG"), Some(AssetClass::Commodities));
    assert_eq!(universe.class_of("SPY"), None);
  }
}
