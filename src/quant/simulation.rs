//! # Simulation
//!
//! $$
//! V_t = (V_{t-1} + C_t)\Bigl(1 + \sum_i w_i r_{i,t}\Bigr)
//! $$
//!
//! Historical replay of a fixed allocation against a benchmark, with
//! optional monthly contributions, and summary metrics of the replayed path.

pub mod replay;
pub mod scenario;

use serde::Deserialize;
use serde::Serialize;

pub use replay::SimulationEngine;
pub use replay::SimulationPoint;
pub use replay::SimulationRequest;
pub use replay::SimulationRun;
pub use replay::replay_aligned;
pub use scenario::ScenarioAnalyzer;
pub use scenario::ScenarioMetrics;
pub use scenario::drawdown_series;
pub use scenario::max_drawdown;

/// Runtime configuration for [`SimulationEngine`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
  /// Trading days per year, used to size history requirements.
  pub trading_days: f64,
  /// Calendar days the first aligned date may trail the horizon start.
  pub history_grace_days: u32,
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      trading_days: crate::quant::TRADING_DAYS,
      history_grace_days: 7,
    }
  }
}
