//! Market aggregation.
//!
//! Per match group: prune duplicate listings from the same bookmaker, then
//! find the best price, the bookmakers offering it and the price spread for
//! every target market.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::matching::MatchGroup;
use crate::types::{MarketKey, Quote};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Lowest odd admitted into comparisons (inclusive).
    pub odds_min: f64,
    /// Highest odd admitted into comparisons (inclusive).
    pub odds_max: f64,
    /// Spreads above this are clamped; they are almost always bad data.
    pub spread_ceiling_pct: f64,
    /// Bookmakers within this distance of the best odd share the best price.
    pub tie_tolerance: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            odds_min: 1.0,
            odds_max: 5.0,
            spread_ceiling_pct: 60.0,
            tie_tolerance: 0.005,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Best price and spread for one market within one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub market: MarketKey,
    pub best_value: Option<f64>,
    /// First bookmaker holding the exact best value.
    pub best_bookmaker: Option<String>,
    /// Every bookmaker within the tie tolerance of the best value.
    pub tied_bookmakers: Vec<String>,
    pub min_value: Option<f64>,
    pub spread_pct: f64,
    /// Zero means "no data".
    pub sample_count: usize,
}

impl MarketSummary {
    pub fn no_data(market: MarketKey) -> Self {
        Self {
            market,
            best_value: None,
            best_bookmaker: None,
            tied_bookmakers: Vec::new(),
            min_value: None,
            spread_pct: 0.0,
            sample_count: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.sample_count > 0
    }
}

// ---------------------------------------------------------------------------
// Dedup
// ---------------------------------------------------------------------------

/// Keep one quote per bookmaker: the one with the most populated target
/// markets, the first seen on ties. Survivors keep their original order. Returns the
/// number of quotes pruned. Idempotent.
pub fn dedup_by_bookmaker(group: &mut MatchGroup) -> usize {
    let mut keep: HashMap<&str, usize> = HashMap::new();
    for (i, quote) in group.quotes.iter().enumerate() {
        match keep.get(quote.bookmaker.as_str()) {
            Some(&kept) if group.quotes[kept].target_count() >= quote.target_count() => {}
            _ => {
                keep.insert(quote.bookmaker.as_str(), i);
            }
        }
    }

    let mut survivors: Vec<usize> = keep.into_values().collect();
    if survivors.len() == group.quotes.len() {
        return 0;
    }
    survivors.sort_unstable();

    let before = group.quotes.len();
    let mut slots: Vec<Option<Quote>> = std::mem::take(&mut group.quotes)
        .into_iter()
        .map(Some)
        .collect();
    group.quotes = survivors.into_iter().filter_map(|i| slots[i].take()).collect();

    let pruned = before - group.quotes.len();
    debug!(group = group.id, pruned, "Pruned same-bookmaker duplicates");
    pruned
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub struct MarketAggregator {
    config: AggregatorConfig,
}

impl MarketAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Summaries for every target market, in target order.
    pub fn summarize(&self, group: &MatchGroup) -> Vec<MarketSummary> {
        MarketKey::TARGET
            .iter()
            .map(|&market| self.summarize_market(group, market))
            .collect()
    }

    pub fn summarize_market(&self, group: &MatchGroup, market: MarketKey) -> MarketSummary {
        let samples: Vec<(&str, f64)> = group
            .quotes
            .iter()
            .filter_map(|q| q.odd(market).map(|v| (q.bookmaker.as_str(), v)))
            .inspect(|(_, v)| debug_assert!(*v > 0.0, "non-positive odd reached aggregation"))
            .filter(|(_, v)| self.is_admissible(*v))
            .collect();

        if samples.is_empty() {
            return MarketSummary::no_data(market);
        }

        let max = samples.iter().map(|(_, v)| *v).fold(f64::MIN, f64::max);
        let min = samples.iter().map(|(_, v)| *v).fold(f64::MAX, f64::min);

        let best_bookmaker = samples
            .iter()
            .find(|(_, v)| *v == max)
            .map(|(bk, _)| bk.to_string());
        let tied_bookmakers = samples
            .iter()
            .filter(|(_, v)| (max - v).abs() < self.config.tie_tolerance)
            .map(|(bk, _)| bk.to_string())
            .collect();

        let spread_pct = if samples.len() >= 2 {
            ((max - min) / min * 100.0).clamp(0.0, self.config.spread_ceiling_pct)
        } else {
            0.0
        };

        MarketSummary {
            market,
            best_value: Some(max),
            best_bookmaker,
            tied_bookmakers,
            min_value: Some(min),
            spread_pct,
            sample_count: samples.len(),
        }
    }

    fn is_admissible(&self, odd: f64) -> bool {
        odd >= self.config.odds_min && odd <= self.config.odds_max
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
