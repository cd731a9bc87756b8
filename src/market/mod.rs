//! Market analysis: dedup, best prices, spreads and arbitrage per group.

pub mod aggregator;
pub mod analysis;
pub mod arbitrage;

pub use aggregator::{dedup_by_bookmaker, AggregatorConfig, MarketAggregator, MarketSummary};
pub use analysis::{rank, GroupAnalysis};
pub use arbitrage::{ArbitrageOutcome, ArbitrageResult, Partition};
