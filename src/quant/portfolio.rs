//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Return statistics, long-only optimization, efficient frontier,
//! rebalancing and tax-loss screening.

pub mod engine;
pub mod frontier;
pub mod income;
pub mod optimizers;
pub mod rebalance;
pub mod returns;
pub mod stats;
pub mod tax_loss;
pub mod types;
pub mod universe;

pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use engine::evaluate;
pub use frontier::efficient_frontier;
pub use income::IncomeEstimate;
pub use income::estimate_annual_income;
pub use optimizers::SolverConfig;
pub use optimizers::maximize_sharpe;
pub use optimizers::minimize_variance_for_return;
pub use rebalance::DEFAULT_REBALANCE_THRESHOLD;
pub use rebalance::Trade;
pub use rebalance::TradeSide;
pub use returns::AlignedPrices;
pub use returns::ReturnStatistics;
pub use returns::align_on_common_dates;
pub use returns::simple_returns;
pub use stats::PortfolioStats;
pub use stats::portfolio_stats;
pub use tax_loss::DEFAULT_LOSS_THRESHOLD;
pub use tax_loss::TaxLossOpportunity;
pub use tax_loss::TaxLot;
pub use types::AllocationOutcome;
pub use types::AssetAllocation;
pub use types::FrontierPoint;
pub use types::PortfolioResult;
pub use types::RiskTier;
pub use universe::AssetClass;
pub use universe::AssetGroup;
pub use universe::AssetUniverse;
pub use universe::RiskTemplates;
pub use universe::TierSplit;
