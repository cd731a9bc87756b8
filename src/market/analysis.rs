//! Group analysis: summaries, arbitrage and headline figures per group.

use serde::Serialize;
use std::cmp::Ordering;

use super::aggregator::{MarketAggregator, MarketSummary};
use super::arbitrage::{evaluate_all, ArbitrageResult, Partition};
use crate::matching::MatchGroup;
use crate::types::MarketKey;

/// Everything the report and ticket stages need to know about one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupAnalysis {
    pub group: MatchGroup,
    /// One per target market, in target order.
    pub summaries: Vec<MarketSummary>,
    /// One per partition, in `Partition::ALL` order.
    pub arbitrage: Vec<ArbitrageResult>,
    /// Target market with the widest spread among markets with data.
    pub best_market: Option<MarketKey>,
    /// Profit of the best market's partition.
    pub headline_profit: Option<f64>,
}

impl GroupAnalysis {
    pub fn build(group: MatchGroup, aggregator: &MarketAggregator) -> Self {
        let summaries = aggregator.summarize(&group);
        let arbitrage = evaluate_all(&summaries);
        let best_market = best_market(&summaries);
        let headline_profit = best_market
            .and_then(Partition::of)
            .and_then(|p| arbitrage.iter().find(|r| r.partition == p))
            .and_then(ArbitrageResult::profit_pct);

        Self {
            group,
            summaries,
            arbitrage,
            best_market,
            headline_profit,
        }
    }

    pub fn summary(&self, market: MarketKey) -> Option<&MarketSummary> {
        self.summaries.iter().find(|s| s.market == market)
    }

    pub fn partition(&self, partition: Partition) -> Option<&ArbitrageResult> {
        self.arbitrage.iter().find(|r| r.partition == partition)
    }

    pub fn has_arbitrage(&self) -> bool {
        self.arbitrage.iter().any(ArbitrageResult::is_arbitrage)
    }
}

/// Highest spread wins; ties go to the earlier market in target order.
fn best_market(summaries: &[MarketSummary]) -> Option<MarketKey> {
    let mut best: Option<&MarketSummary> = None;
    for s in summaries.iter().filter(|s| s.has_data()) {
        match best {
            Some(b) if s.spread_pct <= b.spread_pct => {}
            _ => best = Some(s),
        }
    }
    best.map(|s| s.market)
}

/// Sort by headline profit descending, groups without one last. Stable.
pub fn rank(analyses: &mut [GroupAnalysis]) {
    analyses.sort_by(|a, b| match (a.headline_profit, b.headline_profit) {
        (Some(pa), Some(pb)) => pb.partial_cmp(&pa).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
