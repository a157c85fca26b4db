//! # Yahoo Finance
//!
//! Blocking [`PriceHistoryProvider`] backed by `yahoo_finance_api`.
//! Enabled with the `yahoo` cargo feature.

use anyhow::Context;
use chrono::DateTime;
use chrono::Utc;
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

use super::provider::PriceHistoryProvider;
use super::series::Period;
use super::series::PricePoint;
use super::series::PriceSeries;

/// Daily closes from Yahoo Finance.
pub struct YahooPriceHistory {
  connector: yahoo::YahooConnector,
}

impl YahooPriceHistory {
  pub fn new() -> anyhow::Result<Self> {
    Ok(Self {
      connector: yahoo::YahooConnector::new()?,
    })
  }
}

impl PriceHistoryProvider for YahooPriceHistory {
  fn fetch(&self, symbol: &str, period: Period) -> anyhow::Result<PriceSeries> {
    let today = Utc::now().date_naive();
    let response = match period.start_from(today) {
      Some(start) => {
        let start_ts = start
          .and_hms_opt(0, 0, 0)
          .context("invalid start date")?
          .and_utc()
          .timestamp();
        let start = OffsetDateTime::from_unix_timestamp(start_ts)?;
        self
          .connector
          .get_quote_history(symbol, start, OffsetDateTime::now_utc())
          .with_context(|| format!("quote history request for {symbol}"))?
      }
      None => self
        .connector
        .get_quote_range(symbol, "1d", "max")
        .with_context(|| format!("quote range request for {symbol}"))?,
    };

    let quotes = response
      .quotes()
      .with_context(|| format!("no quotes in response for {symbol}"))?;

    // Yahoo occasionally repeats the current session; keep the last print per day.
    let mut points: Vec<PricePoint> = Vec::with_capacity(quotes.len());
    for quote in quotes {
      let Some(ts) = i64::try_from(quote.timestamp).ok() else {
        continue;
      };
      let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
        continue;
      };
      if !(quote.close.is_finite() && quote.close > 0.0) {
        continue;
      }
      match points.last_mut() {
        Some(last) if last.date == date => last.close = quote.close,
        Some(last) if last.date > date => continue,
        _ => points.push(PricePoint::new(date, quote.close)),
      }
    }

    PriceSeries::new(symbol, points)
  }
}
