//! Arbitrage evaluation.
//!
//! A partition of mutually exclusive, exhaustive outcomes is an arbitrage
//! when the inverse odds of its best prices sum to less than one: staking
//! `1/odd` on every leg returns more than the total stake whatever happens.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::aggregator::MarketSummary;
use crate::types::MarketKey;

/// Outcome partitions evaluated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// `1`, `X`, `2`
    MatchResult,
    /// `0-2`, `3+`
    Goals,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Partition::MatchResult, Partition::Goals];

    pub fn legs(&self) -> &'static [MarketKey] {
        match self {
            Partition::MatchResult => &[MarketKey::Home, MarketKey::Draw, MarketKey::Away],
            Partition::Goals => &[MarketKey::Goals0To2, MarketKey::Goals3Plus],
        }
    }

    /// The partition a target market belongs to.
    pub fn of(market: MarketKey) -> Option<Partition> {
        Partition::ALL.into_iter().find(|p| p.legs().contains(&market))
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::MatchResult => write!(f, "1-X-2"),
            Partition::Goals => write!(f, "0-2/3+"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArbitrageOutcome {
    InsufficientData,
    Evaluated {
        inverse_sum: f64,
        is_arbitrage: bool,
        /// `(1 − inverse_sum) × 100`, negative when there is no arbitrage.
        profit_pct: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageResult {
    pub partition: Partition,
    pub outcome: ArbitrageOutcome,
}

impl ArbitrageResult {
    pub fn profit_pct(&self) -> Option<f64> {
        match self.outcome {
            ArbitrageOutcome::Evaluated { profit_pct, .. } => Some(profit_pct),
            ArbitrageOutcome::InsufficientData => None,
        }
    }

    pub fn is_arbitrage(&self) -> bool {
        matches!(
            self.outcome,
            ArbitrageOutcome::Evaluated {
                is_arbitrage: true,
                ..
            }
        )
    }
}

/// Evaluate one partition from the group's best prices.
pub fn evaluate(partition: Partition, summaries: &[MarketSummary]) -> ArbitrageResult {
    let best: Option<Vec<f64>> = partition
        .legs()
        .iter()
        .map(|leg| {
            summaries
                .iter()
                .find(|s| s.market == *leg)
                .and_then(|s| s.best_value)
                .filter(|v| *v > 0.0)
        })
        .collect();

    let outcome = match best {
        Some(odds) => {
            let inverse_sum: f64 = odds.iter().map(|o| 1.0 / o).sum();
            ArbitrageOutcome::Evaluated {
                inverse_sum,
                is_arbitrage: inverse_sum < 1.0,
                profit_pct: (1.0 - inverse_sum) * 100.0,
            }
        }
        None => ArbitrageOutcome::InsufficientData,
    };

    ArbitrageResult { partition, outcome }
}

/// Evaluate every partition, in `Partition::ALL` order.
pub fn evaluate_all(summaries: &[MarketSummary]) -> Vec<ArbitrageResult> {
    Partition::ALL
        .into_iter()
        .map(|p| evaluate(p, summaries))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
