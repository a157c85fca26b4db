//! # Risk Profile
//!
//! $$
//! S = \operatorname{round}\Bigl(\sum_k \omega_k s_k\Bigr) \in [0, 100]
//! $$
//!
//! Questionnaire scoring. Each answer maps to a sub-score `s_k` in `[0, 100]`,
//! the weighted total is bucketed into a [`RiskTier`].

use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

use crate::error::EngineError;
use crate::error::Result;
use crate::quant::portfolio::RiskTier;

/// Answer weights in percent: age, income, savings, horizon, attitude,
/// knowledge, loss tolerance.
const WEIGHTS_PCT: [u32; 7] = [15, 10, 10, 15, 20, 15, 15];

/// Upper bounds (exclusive) of the score buckets, least aggressive first.
const TIER_BOUNDS: [(u32, RiskTier); 4] = [
  (30, RiskTier::Conservative),
  (45, RiskTier::ModerateConservative),
  (60, RiskTier::Moderate),
  (75, RiskTier::ModerateAggressive),
];

fn neutral() -> u8 {
  3
}

/// Investor answers. Scales run 1 (lowest) to 5 (highest).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
  pub age: u32,
  /// Annual income in dollars.
  pub income: f64,
  /// Liquid savings in dollars.
  pub savings: f64,
  /// Years until the money is needed.
  pub investment_horizon: f64,
  #[serde(default = "neutral")]
  pub risk_attitude: u8,
  #[serde(default = "neutral")]
  pub investment_knowledge: u8,
  #[serde(default = "neutral")]
  pub loss_tolerance: u8,
  #[serde(default)]
  pub retirement_planning: bool,
  #[serde(default)]
  pub wealth_building: bool,
  #[serde(default)]
  pub income_generation: bool,
  #[serde(default)]
  pub tax_efficiency: bool,
  #[serde(default)]
  pub capital_preservation: bool,
}

impl Default for Questionnaire {
  fn default() -> Self {
    Self {
      age: 0,
      income: 0.0,
      savings: 0.0,
      investment_horizon: 0.0,
      risk_attitude: neutral(),
      investment_knowledge: neutral(),
      loss_tolerance: neutral(),
      retirement_planning: false,
      wealth_building: false,
      income_generation: false,
      tax_efficiency: false,
      capital_preservation: false,
    }
  }
}

impl Questionnaire {
  fn sub_scores(&self) -> Result<[u32; 7]> {
    for (name, value) in [
      ("risk_attitude", self.risk_attitude),
      ("investment_knowledge", self.investment_knowledge),
      ("loss_tolerance", self.loss_tolerance),
    ] {
      if !(1..=5).contains(&value) {
        return Err(EngineError::invalid_parameter(format!(
          "{name} must be between 1 and 5, got {value}"
        )));
      }
    }
    for (name, value) in [
      ("income", self.income),
      ("savings", self.savings),
      ("investment_horizon", self.investment_horizon),
    ] {
      if !value.is_finite() || value < 0.0 {
        return Err(EngineError::invalid_parameter(format!(
          "{name} must be finite and non-negative, got {value}"
        )));
      }
    }

    let age = match self.age {
      0..=29 => 100,
      30..=39 => 80,
      40..=49 => 60,
      50..=59 => 40,
      _ => 20,
    };
    let income = if self.income > 200_000.0 {
      100
    } else if self.income > 100_000.0 {
      80
    } else if self.income > 50_000.0 {
      60
    } else {
      40
    };
    let savings = if self.savings > 500_000.0 {
      100
    } else if self.savings > 100_000.0 {
      80
    } else if self.savings > 25_000.0 {
      60
    } else {
      40
    };
    let horizon = if self.investment_horizon > 10.0 {
      100
    } else if self.investment_horizon > 5.0 {
      75
    } else if self.investment_horizon > 3.0 {
      50
    } else {
      25
    };

    Ok([
      age,
      income,
      savings,
      horizon,
      u32::from(self.risk_attitude) * 20,
      u32::from(self.investment_knowledge) * 20,
      u32::from(self.loss_tolerance) * 20,
    ])
  }

  /// Weighted score in `[0, 100]`, halves rounded to even.
  pub fn score(&self) -> Result<u32> {
    let hundredths: u32 = self
      .sub_scores()?
      .iter()
      .zip(WEIGHTS_PCT.iter())
      .map(|(s, w)| s * w)
      .sum();

    let (whole, rest) = (hundredths / 100, hundredths % 100);
    let rounded = match rest.cmp(&50) {
      std::cmp::Ordering::Less => whole,
      std::cmp::Ordering::Greater => whole + 1,
      std::cmp::Ordering::Equal => whole + whole % 2,
    };
    Ok(rounded)
  }

  /// Goals flagged in the answers, in a fixed order.
  pub fn goals(&self) -> Vec<InvestmentGoal> {
    [
      (self.retirement_planning, InvestmentGoal::RetirementPlanning),
      (self.wealth_building, InvestmentGoal::WealthBuilding),
      (self.income_generation, InvestmentGoal::IncomeGeneration),
      (self.tax_efficiency, InvestmentGoal::TaxEfficiency),
      (self.capital_preservation, InvestmentGoal::CapitalPreservation),
    ]
    .into_iter()
    .filter_map(|(flagged, goal)| flagged.then_some(goal))
    .collect()
  }
}

/// Tier for a questionnaire score.
pub fn tier_for_score(score: u32) -> RiskTier {
  TIER_BOUNDS
    .iter()
    .find(|(bound, _)| score < *bound)
    .map_or(RiskTier::Aggressive, |(_, tier)| *tier)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentGoal {
  RetirementPlanning,
  WealthBuilding,
  IncomeGeneration,
  TaxEfficiency,
  CapitalPreservation,
}

impl InvestmentGoal {
  pub fn label(&self) -> &'static str {
    match self {
      InvestmentGoal::RetirementPlanning => "Retirement Planning",
      InvestmentGoal::WealthBuilding => "Wealth Building",
      InvestmentGoal::IncomeGeneration => "Income Generation",
      InvestmentGoal::TaxEfficiency => "Tax Efficiency",
      InvestmentGoal::CapitalPreservation => "Capital Preservation",
    }
  }
}

impl Display for InvestmentGoal {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

/// Human-readable description of a tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RiskSummary {
  pub description: &'static str,
  pub suitable_for: &'static str,
  pub expected_return: &'static str,
  pub volatility: &'static str,
  pub investment_horizon: &'static str,
}

impl RiskSummary {
  pub fn for_tier(tier: RiskTier) -> Self {
    match tier {
      RiskTier::Conservative => Self {
        description: "Focus on preserving capital with modest growth potential",
        suitable_for: "Investors close to retirement or with low risk tolerance",
        expected_return: "4-6% annually",
        volatility: "Low",
        investment_horizon: "1-3 years",
      },
      RiskTier::ModerateConservative => Self {
        description: "Balanced approach with emphasis on stability",
        suitable_for: "Investors seeking steady growth with limited volatility",
        expected_return: "5-7% annually",
        volatility: "Low to Medium",
        investment_horizon: "3-5 years",
      },
      RiskTier::Moderate => Self {
        description: "Balance between growth and stability",
        suitable_for: "Investors comfortable with market fluctuations",
        expected_return: "6-8% annually",
        volatility: "Medium",
        investment_horizon: "5-10 years",
      },
      RiskTier::ModerateAggressive => Self {
        description: "Growth-oriented with higher risk tolerance",
        suitable_for: "Long-term investors seeking capital appreciation",
        expected_return: "7-9% annually",
        volatility: "Medium to High",
        investment_horizon: "10-15 years",
      },
      RiskTier::Aggressive => Self {
        description: "Maximum growth potential with high risk tolerance",
        suitable_for: "Young investors with long time horizons",
        expected_return: "8-10%+ annually",
        volatility: "High",
        investment_horizon: "15+ years",
      },
    }
  }
}

/// Scored questionnaire.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskAssessment {
  pub score: u32,
  pub tier: RiskTier,
  pub goals: Vec<InvestmentGoal>,
  pub summary: RiskSummary,
}

pub fn assess(answers: &Questionnaire) -> Result<RiskAssessment> {
  let score = answers.score()?;
  let tier = tier_for_score(score);
  Ok(RiskAssessment {
    score,
    tier,
    goals: answers.goals(),
    summary: RiskSummary::for_tier(tier),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn answers() -> Questionnaire {
    Questionnaire {
      age: 35,
      income: 120_000.0,
      savings: 60_000.0,
      investment_horizon: 12.0,
      risk_attitude: 4,
      investment_knowledge: 3,
      loss_tolerance: 3,
      retirement_planning: true,
      tax_efficiency: true,
      ..Questionnaire::default()
    }
  }

  #[test]
  fn scores_weighted_answers() {
    // 80*.15 + 80*.10 + 60*.10 + 100*.15 + 80*.20 + 60*.15 + 60*.15 = 75
    let assessment = assess(&answers()).unwrap();
    assert_eq!(assessment.score, 75);
    assert_eq!(assessment.tier, RiskTier::Aggressive);
    assert_eq!(assessment.summary.investment_horizon, "15+ years");
  }

  #[test]
  fn tier_boundaries_are_exclusive() {
    assert_eq!(tier_for_score(0), RiskTier::Conservative);
    assert_eq!(tier_for_score(29), RiskTier::Conservative);
    assert_eq!(tier_for_score(30), RiskTier::ModerateConservative);
    assert_eq!(tier_for_score(45), RiskTier::Moderate);
    assert_eq!(tier_for_score(59), RiskTier::Moderate);
    assert_eq!(tier_for_score(60), RiskTier::ModerateAggressive);
    assert_eq!(tier_for_score(75), RiskTier::Aggressive);
    assert_eq!(tier_for_score(100), RiskTier::Aggressive);
  }

  #[test]
  fn halves_round_to_even() {
    // 20*.15 + 40*.10 + 40*.10 + 50*.15 + 20*.20 + 20*.15 + 20*.15 = 28.5
    let cautious = Questionnaire {
      age: 70,
      investment_horizon: 4.0,
      risk_attitude: 1,
      investment_knowledge: 1,
      loss_tolerance: 1,
      ..Questionnaire::default()
    };
    assert_eq!(cautious.score().unwrap(), 28);

    // same with knowledge 2 adds 3 points: 31.5 -> 32
    let nudged = Questionnaire {
      investment_knowledge: 2,
      ..cautious
    };
    assert_eq!(nudged.score().unwrap(), 32);
  }

  #[test]
  fn goals_follow_flags_in_order() {
    let goals = answers().goals();
    assert_eq!(
      goals,
      vec![InvestmentGoal::RetirementPlanning, InvestmentGoal::TaxEfficiency]
    );
    assert_eq!(goals[1].to_string(), "Tax Efficiency");
  }

  #[test]
  fn out_of_range_scale_is_rejected() {
    let bad = Questionnaire {
      risk_attitude: 6,
      ..answers()
    };
    assert_eq!(bad.score().unwrap_err().code(), "INVALID_PARAMETER");
  }

  #[test]
  fn missing_scales_default_to_neutral() {
    let parsed: Questionnaire = serde_json::from_str(
      r#"{"age": 45, "income": 80000, "savings": 10000, "investment_horizon": 5}"#,
    )
    .unwrap();
    assert_eq!(parsed.risk_attitude, 3);
    assert!(parsed.goals().is_empty());
    // 60*.15 + 60*.10 + 40*.10 + 50*.15 + 60*.20 + 60*.15 + 60*.15 = 56.5
    assert_eq!(parsed.score().unwrap(), 56);
  }

  #[test]
  fn every_tier_has_a_summary() {
    for tier in RiskTier::ALL {
      assert!(!RiskSummary::for_tier(tier).description.is_empty());
    }
  }
}
