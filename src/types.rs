//! Shared types for oddsbridge.
//!
//! These types form the data model used across all pipeline stages.
//! They are kept free of stage logic so that ingest, matching, market
//! and strategy modules can depend on them without circular references.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Convert an `f64` into a `Decimal`, falling back to zero for values that
/// cannot be represented (NaN, infinities).
pub fn d(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Market keys
// ---------------------------------------------------------------------------

/// A betting market as printed in the per-match records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarketKey {
    #[serde(rename = "1")]
    Home,
    #[serde(rename = "X")]
    Draw,
    #[serde(rename = "2")]
    Away,
    #[serde(rename = "0-2")]
    Goals0To2,
    #[serde(rename = "2+")]
    Goals2Plus,
    #[serde(rename = "3+")]
    Goals3Plus,
    #[serde(rename = "4+")]
    Goals4Plus,
    #[serde(rename = "GG")]
    BothScore,
    #[serde(rename = "IGG")]
    NotBothScore,
    #[serde(rename = "GG&3+")]
    BothScore3Plus,
    #[serde(rename = "GG&4+")]
    BothScore4Plus,
}

impl MarketKey {
    /// Every market the parser understands.
    pub const ALL: &'static [MarketKey] = &[
        MarketKey::Home,
        MarketKey::Draw,
        MarketKey::Away,
        MarketKey::Goals0To2,
        MarketKey::Goals2Plus,
        MarketKey::Goals3Plus,
        MarketKey::Goals4Plus,
        MarketKey::BothScore,
        MarketKey::NotBothScore,
        MarketKey::BothScore3Plus,
        MarketKey::BothScore4Plus,
    ];

    /// Markets that take part in usability checks, best-price search and
    /// arbitrage evaluation. Order matters: it breaks best-market ties.
    pub const TARGET: &'static [MarketKey] = &[
        MarketKey::Home,
        MarketKey::Draw,
        MarketKey::Away,
        MarketKey::Goals0To2,
        MarketKey::Goals3Plus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketKey::Home => "1",
            MarketKey::Draw => "X",
            MarketKey::Away => "2",
            MarketKey::Goals0To2 => "0-2",
            MarketKey::Goals2Plus => "2+",
            MarketKey::Goals3Plus => "3+",
            MarketKey::Goals4Plus => "4+",
            MarketKey::BothScore => "GG",
            MarketKey::NotBothScore => "IGG",
            MarketKey::BothScore3Plus => "GG&3+",
            MarketKey::BothScore4Plus => "GG&4+",
        }
    }

    pub fn is_target(&self) -> bool {
        Self::TARGET.contains(self)
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MarketKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        MarketKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("Unknown market key: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

/// One bookmaker's listing of one fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Source label attached by the collaborator that produced the record.
    pub bookmaker: String,
    pub kickoff_time: NaiveTime,
    /// Year is inferred from the run's reference date.
    pub kickoff_date: Option<NaiveDate>,
    /// Weekday abbreviation as printed ("Sub", "Ned", ...)
    pub day: Option<String>,
    pub league: Option<String>,
    pub home: String,
    pub away: String,
    pub match_id: Option<String>,
    /// Populated markets only; a missing key means "not offered".
    pub markets: BTreeMap<MarketKey, f64>,
}

impl Quote {
    pub fn odd(&self, market: MarketKey) -> Option<f64> {
        self.markets.get(&market).copied()
    }

    /// Number of populated markets across every known key.
    pub fn populated_count(&self) -> usize {
        self.markets.len()
    }

    /// Number of populated markets in the target set.
    pub fn target_count(&self) -> usize {
        MarketKey::TARGET
            .iter()
            .filter(|k| self.markets.contains_key(k))
            .count()
    }

    /// Quotes with fewer than two target markets only pollute comparisons.
    pub fn is_usable(&self) -> bool {
        self.target_count() >= 2
    }

    /// One-line fixture description, e.g. `18:00 24.10. Havre vs Brest (France 1)`.
    pub fn description(&self) -> String {
        let mut out = self.kickoff_time.format("%H:%M").to_string();
        if let Some(date) = self.kickoff_date {
            out.push(' ');
            out.push_str(&date.format("%d.%m.").to_string());
        }
        out.push_str(&format!(" {} vs {}", self.home, self.away));
        if let Some(league) = self.league.as_deref().filter(|l| !l.is_empty()) {
            out.push_str(&format!(" ({league})"));
        }
        out
    }

    /// `1=2.10  |  X=3.40  |  ...` over every populated market.
    pub fn markets_line(&self) -> String {
        if self.markets.is_empty() {
            return "-".to_string();
        }
        self.markets
            .iter()
            .map(|(k, v)| format!("{k}={v:.2}"))
            .collect::<Vec<_>>()
            .join("  |  ")
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} :: {}", self.bookmaker, self.description(), self.markets_line())
    }
}

// ---------------------------------------------------------------------------
// Pick
// ---------------------------------------------------------------------------

/// One selected leg for ticket building, derived from a group's best price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    /// Id of the match group the leg comes from.
    pub group_id: usize,
    pub match_description: String,
    pub market: MarketKey,
    pub odd: f64,
    pub bookmaker: String,
    pub spread_pct: f64,
    /// Profit of the partition this leg belongs to, if it could be evaluated.
    pub profit_pct: Option<f64>,
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profit = self
            .profit_pct
            .map(|p| format!("{p:.2}%"))
            .unwrap_or_else(|| "n/a".to_string());
        write!(
            f,
            "[{}] {} | {} @ {:.2} | spread={:.2}% profit={}",
            self.bookmaker, self.match_description, self.market, self.odd, self.spread_pct, profit,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for oddsbridge.
#[derive(Debug, thiserror::Error)]
pub enum OddsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source error ({bookmaker}): {message}")]
    Source { bookmaker: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
