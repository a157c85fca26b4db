//! # Return Statistics
//!
//! $$
//! \mu_i = 252\,\bar r_i,\qquad \Sigma_{ij} = 252\,\widehat{\operatorname{cov}}(r_i, r_j)
//! $$
//!
//! Aligns price series on common dates, converts them to simple daily returns
//! and annualizes mean and covariance.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::info;
use tracing::warn;

use crate::error::EngineError;
use crate::error::Result;
use crate::market::FetchReport;
use crate::market::Period;
use crate::market::PriceHistoryProvider;
use crate::market::PriceSeries;
use crate::market::SymbolFailure;
use crate::market::fetch_all;
use crate::quant::TRADING_DAYS;

/// Minimum aligned price observations per symbol.
pub const MIN_ALIGNED_POINTS: usize = 2;

fn sample_mean(xs: &[f64]) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.iter().sum::<f64>() / xs.len() as f64
  }
}

/// Closing prices restricted to the dates every series shares.
#[derive(Clone, Debug, Default)]
pub struct AlignedPrices {
  pub dates: Vec<NaiveDate>,
  /// `closes[i][t]` is the close of series `i` on `dates[t]`.
  pub closes: Vec<Vec<f64>>,
}

impl AlignedPrices {
  /// Simple returns per series; `returns[i][t]` is the change into `dates[t + 1]`.
  pub fn returns(&self) -> Vec<Vec<f64>> {
    self.closes.iter().map(|c| simple_returns(c)).collect()
  }
}

/// Intersect the dates of every series and collect their closes.
pub fn align_on_common_dates(series: &[PriceSeries]) -> AlignedPrices {
  let Some(first) = series.first() else {
    return AlignedPrices::default();
  };

  let mut common: BTreeSet<NaiveDate> = first.points().iter().map(|p| p.date).collect();
  for other in &series[1..] {
    common.retain(|date| other.close_on(*date).is_some());
  }

  let dates: Vec<NaiveDate> = common.into_iter().collect();
  let closes = series
    .iter()
    .map(|s| dates.iter().filter_map(|d| s.close_on(*d)).collect())
    .collect();

  AlignedPrices { dates, closes }
}

/// Day-over-day percentage changes.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
  closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Annualized per-symbol means and covariance.
#[derive(Clone, Debug)]
pub struct ReturnStatistics {
  symbols: Vec<String>,
  means: DVector<f64>,
  covariance: DMatrix<f64>,
  aligned_dates: Vec<NaiveDate>,
  excluded: Vec<SymbolFailure>,
}

impl ReturnStatistics {
  /// Fetch `symbols` over `period` and estimate statistics. Symbols without
  /// any data are excluded and listed in [`ReturnStatistics::excluded`].
  pub fn compute<P: PriceHistoryProvider + ?Sized>(
    provider: &P,
    symbols: &[String],
    period: Period,
  ) -> Result<Self> {
    let report = fetch_all(provider, symbols, period);
    Self::from_report(report)
  }

  pub fn from_report(report: FetchReport) -> Result<Self> {
    let FetchReport { series, failures } = report;
    Self::from_series(&series, failures)
  }

  /// Estimate statistics from already-fetched series.
  pub fn from_series(series: &[PriceSeries], excluded: Vec<SymbolFailure>) -> Result<Self> {
    for failure in &excluded {
      warn!(symbol = %failure.symbol, reason = %failure.reason, "excluding symbol from return statistics");
    }

    if series.is_empty() {
      let requested = excluded
        .iter()
        .map(|f| f.symbol.as_str())
        .collect::<Vec<_>>()
        .join(",");
      return Err(EngineError::insufficient_history(
        requested,
        MIN_ALIGNED_POINTS,
        0,
      ));
    }

    let aligned = align_on_common_dates(series);
    if aligned.dates.len() < MIN_ALIGNED_POINTS {
      let shortest = series
        .iter()
        .min_by_key(|s| s.len())
        .map(|s| s.symbol().to_string())
        .unwrap_or_default();
      return Err(EngineError::insufficient_history(
        shortest,
        MIN_ALIGNED_POINTS,
        aligned.dates.len(),
      ));
    }

    let returns = aligned.returns();
    let n = series.len();
    let n_periods = returns[0].len();
    let daily_means: Vec<f64> = returns.iter().map(|r| sample_mean(r)).collect();

    // A single return has no spread; treat it as zero variance rather than NaN.
    let denom = n_periods.saturating_sub(1).max(1) as f64;
    let mut covariance = DMatrix::zeros(n, n);
    for i in 0..n {
      for j in i..n {
        let mut acc = 0.0;
        for t in 0..n_periods {
          acc += (returns[i][t] - daily_means[i]) * (returns[j][t] - daily_means[j]);
        }
        let c = acc / denom * TRADING_DAYS;
        covariance[(i, j)] = c;
        covariance[(j, i)] = c;
      }
    }

    let means = DVector::from_iterator(n, daily_means.iter().map(|m| m * TRADING_DAYS));
    let symbols: Vec<String> = series.iter().map(|s| s.symbol().to_string()).collect();

    info!(
      assets = n,
      observations = aligned.dates.len(),
      excluded = excluded.len(),
      "estimated return statistics"
    );

    Ok(Self {
      symbols,
      means,
      covariance,
      aligned_dates: aligned.dates,
      excluded,
    })
  }

  /// Build directly from annualized inputs. Used for what-if analysis and tests.
  pub fn from_moments(
    symbols: Vec<String>,
    means: DVector<f64>,
    covariance: DMatrix<f64>,
  ) -> Result<Self> {
    let n = symbols.len();
    if n == 0 || means.len() != n || covariance.nrows() != n || covariance.ncols() != n {
      return Err(EngineError::invalid_parameter(format!(
        "moment dimensions disagree: {n} symbols, {} means, {}x{} covariance",
        means.len(),
        covariance.nrows(),
        covariance.ncols()
      )));
    }
    Ok(Self {
      symbols,
      means,
      covariance,
      aligned_dates: Vec::new(),
      excluded: Vec::new(),
    })
  }

  pub fn symbols(&self) -> &[String] {
    &self.symbols
  }

  pub fn means(&self) -> &DVector<f64> {
    &self.means
  }

  pub fn covariance(&self) -> &DMatrix<f64> {
    &self.covariance
  }

  pub fn aligned_dates(&self) -> &[NaiveDate] {
    &self.aligned_dates
  }

  pub fn excluded(&self) -> &[SymbolFailure] {
    &self.excluded
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }

  pub fn index_of(&self, symbol: &str) -> Option<usize> {
    self.symbols.iter().position(|s| s == symbol)
  }

  /// Annualized mean return of `symbol`.
  pub fn mean(&self, symbol: &str) -> Option<f64> {
    self.index_of(symbol).map(|i| self.means[i])
  }

  /// Annualized volatility of `symbol`.
  pub fn volatility(&self, symbol: &str) -> Option<f64> {
    self
      .index_of(symbol)
      .map(|i| self.covariance[(i, i)].max(0.0).sqrt())
  }

  /// Pearson correlation matrix implied by the covariance.
  pub fn correlation(&self) -> DMatrix<f64> {
    let n = self.len();
    let sigmas: Vec<f64> = (0..n)
      .map(|i| self.covariance[(i, i)].max(0.0).sqrt())
      .collect();

    DMatrix::from_fn(n, n, |i, j| {
      let denom = sigmas[i] * sigmas[j];
      if i == j {
        1.0
      } else if denom > 1e-15 {
        (self.covariance[(i, j)] / denom).clamp(-1.0, 1.0)
      } else {
        0.0
      }
    })
  }
}
