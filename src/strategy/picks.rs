//! Pick selection.
//!
//! Turns ranked group analyses into ticket legs and filters out anything
//! that should not be staked: thin spreads, denied bookmakers, profit
//! figures outside the trusted window and women's fixtures.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::DecisionRecord;
use crate::market::{GroupAnalysis, MarketSummary, Partition};
use crate::matching::has_women_marker;
use crate::types::{MarketKey, Pick};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which legs a group contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickMode {
    /// One leg per group: its best market.
    #[default]
    BestMarket,
    /// Every leg with data of each partition whose profit is in the window.
    QualifyingLegs,
}

#[derive(Debug, Clone)]
pub struct PickConfig {
    pub mode: PickMode,
    /// Legs with a thinner spread carry no information.
    pub min_spread_pct: f64,
    /// Compared case-insensitively.
    pub deny_bookmakers: Vec<String>,
    /// Profits above this are treated as stale or mispriced data.
    pub max_profit_pct: f64,
    /// Profits at or below this are too far from break-even.
    pub min_profit_pct: f64,
    pub exclude_women: bool,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            mode: PickMode::BestMarket,
            min_spread_pct: 2.0,
            deny_bookmakers: Vec::new(),
            max_profit_pct: 10.0,
            min_profit_pct: -0.5,
            exclude_women: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    WomenFixture,
    NoMarketData,
    NoProfitFigure,
    ProfitAboveCap { profit_pct: f64, cap: f64 },
    ProfitBelowFloor { profit_pct: f64, floor: f64 },
    SpreadTooLow { spread_pct: f64, min: f64 },
    DeniedBookmaker { bookmaker: String },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::WomenFixture => write!(f, "women's fixture"),
            RejectionReason::NoMarketData => write!(f, "no market data"),
            RejectionReason::NoProfitFigure => write!(f, "no profit figure"),
            RejectionReason::ProfitAboveCap { profit_pct, cap } => {
                write!(f, "profit {profit_pct:.2}% above cap {cap:.2}%")
            }
            RejectionReason::ProfitBelowFloor { profit_pct, floor } => {
                write!(f, "profit {profit_pct:.2}% at or below floor {floor:.2}%")
            }
            RejectionReason::SpreadTooLow { spread_pct, min } => {
                write!(f, "spread {spread_pct:.2}% below {min:.2}%")
            }
            RejectionReason::DeniedBookmaker { bookmaker } => {
                write!(f, "bookmaker {bookmaker} is denied")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

pub struct PickSelector {
    config: PickConfig,
}

impl PickSelector {
    pub fn new(config: PickConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PickConfig {
        &self.config
    }

    /// Produce picks from analyses that are already ranked. Pick order
    /// follows the ranking. Every candidate leaves a decision record.
    pub fn select(&self, analyses: &[GroupAnalysis]) -> (Vec<Pick>, Vec<DecisionRecord>) {
        let mut picks = Vec::new();
        let mut decisions = Vec::new();

        for analysis in analyses {
            let group_id = analysis.group.id;
            let description = analysis.group.description();

            if self.config.exclude_women
                && analysis
                    .group
                    .quotes
                    .iter()
                    .any(|q| has_women_marker(&q.home) || has_women_marker(&q.away))
            {
                self.reject(&mut decisions, group_id, &description, None, RejectionReason::WomenFixture);
                continue;
            }

            match self.config.mode {
                PickMode::BestMarket => {
                    let Some(market) = analysis.best_market else {
                        self.reject(&mut decisions, group_id, &description, None, RejectionReason::NoMarketData);
                        continue;
                    };
                    self.consider(analysis, market, analysis.headline_profit, &mut picks, &mut decisions);
                }
                PickMode::QualifyingLegs => {
                    let mut any_partition = false;
                    for partition in Partition::ALL {
                        let profit = analysis.partition(partition).and_then(|r| r.profit_pct());
                        let Some(profit) = profit else { continue };
                        any_partition = true;
                        if let Err(reason) = self.check_profit(profit) {
                            self.reject(&mut decisions, group_id, &description, None, reason);
                            continue;
                        }
                        for &market in partition.legs() {
                            self.consider(analysis, market, Some(profit), &mut picks, &mut decisions);
                        }
                    }
                    if !any_partition {
                        self.reject(&mut decisions, group_id, &description, None, RejectionReason::NoProfitFigure);
                    }
                }
            }
        }

        info!(
            groups = analyses.len(),
            picks = picks.len(),
            rejected = decisions.len() - picks.len(),
            mode = ?self.config.mode,
            "Pick selection complete"
        );

        (picks, decisions)
    }

    /// Run one leg through the filters and keep it if it passes.
    fn consider(
        &self,
        analysis: &GroupAnalysis,
        market: MarketKey,
        profit_pct: Option<f64>,
        picks: &mut Vec<Pick>,
        decisions: &mut Vec<DecisionRecord>,
    ) {
        let group_id = analysis.group.id;
        let description = analysis.group.description();

        let Some(summary) = analysis.summary(market).filter(|s| s.has_data()) else {
            self.reject(decisions, group_id, &description, Some(market), RejectionReason::NoMarketData);
            return;
        };

        let verdict = profit_pct
            .ok_or(RejectionReason::NoProfitFigure)
            .and_then(|p| self.check_profit(p))
            .and_then(|_| self.check_spread(summary))
            .and_then(|_| self.choose_bookmaker(summary));

        match verdict {
            Ok((bookmaker, odd)) => {
                let pick = Pick {
                    group_id,
                    match_description: description,
                    market,
                    odd,
                    bookmaker,
                    spread_pct: summary.spread_pct,
                    profit_pct,
                };
                debug!(pick = %pick, "Pick selected");
                decisions.push(DecisionRecord::PickSelected { pick: pick.clone() });
                picks.push(pick);
            }
            Err(reason) => self.reject(decisions, group_id, &description, Some(market), reason),
        }
    }

    fn check_profit(&self, profit_pct: f64) -> Result<(), RejectionReason> {
        if profit_pct > self.config.max_profit_pct {
            return Err(RejectionReason::ProfitAboveCap {
                profit_pct,
                cap: self.config.max_profit_pct,
            });
        }
        if profit_pct <= self.config.min_profit_pct {
            return Err(RejectionReason::ProfitBelowFloor {
                profit_pct,
                floor: self.config.min_profit_pct,
            });
        }
        Ok(())
    }

    fn check_spread(&self, summary: &MarketSummary) -> Result<(), RejectionReason> {
        if summary.spread_pct < self.config.min_spread_pct {
            return Err(RejectionReason::SpreadTooLow {
                spread_pct: summary.spread_pct,
                min: self.config.min_spread_pct,
            });
        }
        Ok(())
    }

    /// The representative bookmaker and its price. Only that bookmaker
    /// quoted exactly `best_value`, so a denied representative rejects the leg.
    fn choose_bookmaker(&self, summary: &MarketSummary) -> Result<(String, f64), RejectionReason> {
        let odd = summary.best_value.ok_or(RejectionReason::NoMarketData)?;
        let bookmaker = summary
            .best_bookmaker
            .clone()
            .ok_or(RejectionReason::NoMarketData)?;

        if self.is_denied(&bookmaker) {
            return Err(RejectionReason::DeniedBookmaker { bookmaker });
        }
        Ok((bookmaker, odd))
    }

    fn is_denied(&self, bookmaker: &str) -> bool {
        self.config
            .deny_bookmakers
            .iter()
            .any(|d| d.eq_ignore_ascii_case(bookmaker))
    }

    fn reject(
        &self,
        decisions: &mut Vec<DecisionRecord>,
        group_id: usize,
        description: &str,
        market: Option<MarketKey>,
        reason: RejectionReason,
    ) {
        debug!(
            group = group_id,
            fixture = %description,
            market = ?market,
            reason = %reason,
            "Pick rejected"
        );
        decisions.push(DecisionRecord::PickRejected {
            group_id,
            match_description: description.to_string(),
            market,
            reason,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
