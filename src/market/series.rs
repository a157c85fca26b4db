//! # Price Series
//!
//! $$
//! r_t = \frac{P_t}{P_{t-1}} - 1
//! $$
//!
//! Closing-price time series and lookback periods.

use std::fmt::Display;
use std::str::FromStr;

use anyhow::bail;
use chrono::Days;
use chrono::Months;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::error::EngineError;

/// Lookback window ending at the most recent observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
  Days(u32),
  Months(u32),
  Years(u32),
  /// Entire available history.
  Max,
}

impl Period {
  /// First calendar date covered by the window that ends on `end`.
  /// `None` means unbounded.
  pub fn start_from(&self, end: NaiveDate) -> Option<NaiveDate> {
    match *self {
      Period::Days(n) => end.checked_sub_days(Days::new(u64::from(n))),
      Period::Months(n) => end.checked_sub_months(Months::new(n)),
      Period::Years(n) => end.checked_sub_months(Months::new(n.saturating_mul(12))),
      Period::Max => None,
    }
  }
}

impl From<u32> for Period {
  fn from(years: u32) -> Self {
    Period::Years(years)
  }
}

impl Display for Period {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Period::Days(n) => write!(f, "{n}d"),
      Period::Months(n) => write!(f, "{n}mo"),
      Period::Years(n) => write!(f, "{n}y"),
      Period::Max => write!(f, "max"),
    }
  }
}

impl FromStr for Period {
  type Err = EngineError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let token = s.trim().to_lowercase();
    if token == "max" {
      return Ok(Period::Max);
    }

    let split = token
      .find(|c: char| !c.is_ascii_digit())
      .unwrap_or(token.len());
    let (digits, unit) = token.split_at(split);
    let n: u32 = digits
      .parse()
      .map_err(|_| EngineError::invalid_parameter(format!("unparseable period '{s}'")))?;
    if n == 0 {
      return Err(EngineError::invalid_parameter(format!(
        "period '{s}' must be positive"
      )));
    }

    match unit {
      "d" => Ok(Period::Days(n)),
      "mo" => Ok(Period::Months(n)),
      "y" => Ok(Period::Years(n)),
      _ => Err(EngineError::invalid_parameter(format!(
        "unknown period unit in '{s}'"
      ))),
    }
  }
}

/// A single closing price.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
  pub date: NaiveDate,
  pub close: f64,
}

impl PricePoint {
  pub fn new(date: NaiveDate, close: f64) -> Self {
    Self { date, close }
  }
}

/// Ordered closing prices for one symbol. Dates are strictly increasing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
  symbol: String,
  points: Vec<PricePoint>,
}

impl PriceSeries {
  /// Build a series, rejecting unordered dates and non-positive closes.
  pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> anyhow::Result<Self> {
    let symbol = symbol.into();

    for pair in points.windows(2) {
      if pair[1].date <= pair[0].date {
        bail!(
          "{symbol}: dates must be strictly increasing ({} then {})",
          pair[0].date,
          pair[1].date
        );
      }
    }
    if let Some(bad) = points.iter().find(|p| !(p.close.is_finite() && p.close > 0.0)) {
      bail!("{symbol}: invalid close {} on {}", bad.close, bad.date);
    }

    Ok(Self { symbol, points })
  }

  pub fn symbol(&self) -> &str {
    &self.symbol
  }

  pub fn points(&self) -> &[PricePoint] {
    &self.points
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  pub fn first_date(&self) -> Option<NaiveDate> {
    self.points.first().map(|p| p.date)
  }

  pub fn last_date(&self) -> Option<NaiveDate> {
    self.points.last().map(|p| p.date)
  }

  /// Closing price on `date`, if the series has an observation that day.
  pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
    self
      .points
      .binary_search_by_key(&date, |p| p.date)
      .ok()
      .map(|idx| self.points[idx].close)
  }

  /// Day-over-day percentage changes; one shorter than the series.
  pub fn returns(&self) -> Vec<f64> {
    self
      .points
      .windows(2)
      .map(|w| w[1].close / w[0].close - 1.0)
      .collect()
  }

  /// Restrict the series to `period` counted back from its last date.
  #[must_use]
  pub fn window(&self, period: Period) -> PriceSeries {
    let start = match self.last_date().and_then(|end| period.start_from(end)) {
      Some(start) => start,
      None => return self.clone(),
    };

    PriceSeries {
      symbol: self.symbol.clone(),
      points: self
        .points
        .iter()
        .filter(|p| p.date >= start)
        .copied()
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn parses_fixed_tokens() {
    assert_eq!("1y".parse::<Period>().unwrap(), Period::Years(1));
    assert_eq!("5Y".parse::<Period>().unwrap(), Period::Years(5));
    assert_eq!("6mo".parse::<Period>().unwrap(), Period::Months(6));
    assert_eq!("10d".parse::<Period>().unwrap(), Period::Days(10));
    assert_eq!("max".parse::<Period>().unwrap(), Period::Max);
    assert_eq!(Period::from(3), Period::Years(3));
  }

  #[test]
  fn rejects_bad_tokens() {
    for token in ["", "y", "0y", "5w", "abc"] {
      let err = token.parse::<Period>().unwrap_err();
      assert_eq!(err.code(), "INVALID_PARAMETER", "token {token:?}");
    }
  }

  #[test]
  fn display_round_trips_tokens() {
    for period in [Period::Days(5), Period::Months(6), Period::Years(2), Period::Max] {
      assert_eq!(period.to_string().parse::<Period>().unwrap(), period);
    }
  }

  #[test]
  fn rejects_unordered_dates() {
    let points = vec![
      PricePoint::new(d(2024, 1, 3), 10.0),
      PricePoint::new(d(2024, 1, 2), 11.0),
    ];
    assert!(PriceSeries::new("VTI", points).is_err());
  }

  #[test]
  fn rejects_duplicate_dates_and_bad_closes() {
    let dup = vec![
      PricePoint::new(d(2024, 1, 2), 10.0),
      PricePoint::new(d(2024, 1, 2), 11.0),
    ];
    assert!(PriceSeries::new("VTI", dup).is_err());

    let negative = vec![PricePoint::new(d(2024, 1, 2), -1.0)];
    assert!(PriceSeries::new("VTI", negative).is_err());
  }

  #[test]
  fn returns_are_percentage_changes() {
    let series = PriceSeries::new(
      "VTI",
      vec![
        PricePoint::new(d(2024, 1, 2), 100.0),
        PricePoint::new(d(2024, 1, 3), 110.0),
        PricePoint::new(d(2024, 1, 4), 99.0),
      ],
    )
    .unwrap();

    let r = series.returns();
    assert_eq!(r.len(), 2);
    assert_abs_diff_eq!(r[0], 0.10, epsilon = 1e-12);
    assert_abs_diff_eq!(r[1], -0.10, epsilon = 1e-12);
  }

  #[test]
  fn window_trims_from_last_date() {
    let series = PriceSeries::new(
      "VTI",
      vec![
        PricePoint::new(d(2020, 6, 1), 1.0),
        PricePoint::new(d(2023, 6, 1), 2.0),
        PricePoint::new(d(2024, 1, 2), 3.0),
        PricePoint::new(d(2024, 6, 3), 4.0),
      ],
    )
    .unwrap();

    let one_year = series.window(Period::Years(1));
    assert_eq!(one_year.len(), 2);
    assert_eq!(one_year.first_date(), Some(d(2024, 1, 2)));
    assert_eq!(series.window(Period::Max).len(), 4);
    assert_eq!(series.close_on(d(2023, 6, 1)), Some(2.0));
    assert_eq!(series.close_on(d(2023, 6, 2)), None);
  }
}
