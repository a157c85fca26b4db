//! # Errors
//!
//! Typed failures surfaced by the allocation engine. Every variant maps to a
//! stable [`EngineError::code`] so callers can decide between retrying,
//! falling back and reporting.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error kinds produced by the numeric core.
#[derive(Error, Debug)]
pub enum EngineError {
  /// Not enough aligned price history for the requested window.
  #[error("insufficient history for {symbol}: need at least {required} aligned points, got {available}")]
  InsufficientHistory {
    symbol: String,
    required: usize,
    available: usize,
  },

  /// The constrained solver exhausted its iteration/tolerance budget.
  #[error("optimization did not converge after {iterations} iterations: {reason}")]
  OptimizationDidNotConverge { iterations: u64, reason: String },

  /// Volatility is zero or numerically indistinguishable from zero.
  #[error("sharpe ratio is undefined for volatility {volatility:e}")]
  UndefinedSharpeRatio { volatility: f64 },

  /// Unknown risk-tier key.
  #[error("invalid risk level: {0}")]
  InvalidRiskLevel(String),

  /// Weights do not sum to one or contain negative entries.
  #[error("invalid allocation: {0}")]
  InvalidAllocation(String),

  /// A scalar argument is outside its domain.
  #[error("invalid parameter: {0}")]
  InvalidParameter(String),

  /// The price provider failed for a symbol the call cannot do without.
  #[error("market data unavailable for {symbol}: {reason}")]
  DataUnavailable { symbol: String, reason: String },
}

impl EngineError {
  /// Stable machine-readable code.
  pub fn code(&self) -> &'static str {
    match self {
      Self::InsufficientHistory { .. } => "INSUFFICIENT_HISTORY",
      Self::OptimizationDidNotConverge { .. } => "OPTIMIZATION_DID_NOT_CONVERGE",
      Self::UndefinedSharpeRatio { .. } => "UNDEFINED_SHARPE_RATIO",
      Self::InvalidRiskLevel(_) => "INVALID_RISK_LEVEL",
      Self::InvalidAllocation(_) => "INVALID_ALLOCATION",
      Self::InvalidParameter(_) => "INVALID_PARAMETER",
      Self::DataUnavailable { .. } => "DATA_UNAVAILABLE",
    }
  }

  /// Whether the caller has a sensible recovery path (fallback or retry).
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      Self::OptimizationDidNotConverge { .. } | Self::DataUnavailable { .. }
    )
  }

  pub(crate) fn insufficient_history(
    symbol: impl Into<String>,
    required: usize,
    available: usize,
  ) -> Self {
    Self::InsufficientHistory {
      symbol: symbol.into(),
      required,
      available,
    }
  }

  pub(crate) fn invalid_parameter(message: impl Into<String>) -> Self {
    Self::InvalidParameter(message.into())
  }
}
