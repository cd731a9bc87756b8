//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has defaults, so a missing section means "use the stock values".
//! The per-stage configs are derived from here and handed to each
//! component's constructor.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use crate::market::AggregatorConfig;
use crate::strategy::bankroll::BankrollConfig;
use crate::strategy::picks::{PickConfig, PickMode};
use crate::strategy::tickets::{CompletionRule, TicketConfig};
use crate::types::{d, OddsError};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub run: RunConfig,
    pub sources: Vec<SourceConfig>,
    pub markets: MarketsConfig,
    pub filters: FiltersConfig,
    pub tickets: TicketsConfig,
    pub bankroll: BankrollSection,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Anchors year inference for kickoff dates. Today when unset.
    pub reference_date: Option<NaiveDate>,
}

/// One bookmaker dump on disk.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub bookmaker: String,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarketsConfig {
    pub odds_min: f64,
    pub odds_max: f64,
    pub spread_ceiling_pct: f64,
    pub tie_tolerance: f64,
}

impl Default for MarketsConfig {
    fn default() -> Self {
        let agg = AggregatorConfig::default();
        Self {
            odds_min: agg.odds_min,
            odds_max: agg.odds_max,
            spread_ceiling_pct: agg.spread_ceiling_pct,
            tie_tolerance: agg.tie_tolerance,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FiltersConfig {
    pub pick_mode: PickMode,
    pub min_spread_pct: f64,
    pub deny_bookmakers: Vec<String>,
    pub max_profit_pct: f64,
    pub min_profit_pct: f64,
    pub exclude_women: bool,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        let picks = PickConfig::default();
        Self {
            pick_mode: picks.mode,
            min_spread_pct: picks.min_spread_pct,
            deny_bookmakers: picks.deny_bookmakers,
            max_profit_pct: picks.max_profit_pct,
            min_profit_pct: picks.min_profit_pct,
            exclude_women: picks.exclude_women,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    LegCount,
    Multiplier,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TicketsConfig {
    pub completion: CompletionKind,
    /// Used when `completion = "leg_count"`.
    pub legs: usize,
    /// Used when `completion = "multiplier"`.
    pub multiplier_target: f64,
    pub leg_cap: usize,
}

impl Default for TicketsConfig {
    fn default() -> Self {
        Self {
            completion: CompletionKind::LegCount,
            legs: 2,
            multiplier_target: 3.0,
            leg_cap: TicketConfig::default().leg_cap,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BankrollSection {
    pub stake: f64,
    pub currency: String,
}

impl Default for BankrollSection {
    fn default() -> Self {
        Self {
            stake: 200.0,
            currency: "RSD".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), OddsError> {
        let m = &self.markets;
        let f = &self.filters;
        let numbers = [
            ("markets.odds_min", m.odds_min),
            ("markets.odds_max", m.odds_max),
            ("markets.spread_ceiling_pct", m.spread_ceiling_pct),
            ("markets.tie_tolerance", m.tie_tolerance),
            ("filters.min_spread_pct", f.min_spread_pct),
            ("filters.min_profit_pct", f.min_profit_pct),
            ("filters.max_profit_pct", f.max_profit_pct),
            ("tickets.multiplier_target", self.tickets.multiplier_target),
            ("bankroll.stake", self.bankroll.stake),
        ];
        if let Some((name, value)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(OddsError::Config(format!("{name} ({value}) must be a finite number")));
        }

        if !(m.odds_min > 0.0 && m.odds_min < m.odds_max) {
            return Err(OddsError::Config(format!(
                "markets.odds_min ({}) must be positive and below markets.odds_max ({})",
                m.odds_min, m.odds_max
            )));
        }
        if m.spread_ceiling_pct <= 0.0 {
            return Err(OddsError::Config("markets.spread_ceiling_pct must be positive".into()));
        }
        if m.tie_tolerance < 0.0 {
            return Err(OddsError::Config("markets.tie_tolerance must not be negative".into()));
        }

        if f.min_profit_pct >= f.max_profit_pct {
            return Err(OddsError::Config(format!(
                "filters.min_profit_pct ({}) must be below filters.max_profit_pct ({})",
                f.min_profit_pct, f.max_profit_pct
            )));
        }

        let t = &self.tickets;
        if t.leg_cap < 2 {
            return Err(OddsError::Config(format!("tickets.leg_cap ({}) must be at least 2", t.leg_cap)));
        }
        match t.completion {
            CompletionKind::LegCount if t.legs < 2 || t.legs > t.leg_cap => {
                return Err(OddsError::Config(format!(
                    "tickets.legs ({}) must be between 2 and tickets.leg_cap ({})",
                    t.legs, t.leg_cap
                )));
            }
            CompletionKind::Multiplier if t.multiplier_target <= 1.0 => {
                return Err(OddsError::Config(format!(
                    "tickets.multiplier_target ({}) must be above 1",
                    t.multiplier_target
                )));
            }
            _ => {}
        }

        if self.bankroll.stake <= 0.0 {
            return Err(OddsError::Config(format!(
                "bankroll.stake ({}) must be positive",
                self.bankroll.stake
            )));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.bookmaker.trim().is_empty() {
                return Err(OddsError::Config("sources: bookmaker label is empty".into()));
            }
            if !seen.insert(source.bookmaker.to_lowercase()) {
                return Err(OddsError::Config(format!(
                    "sources: bookmaker {} listed twice",
                    source.bookmaker
                )));
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Per-stage configs
    // -----------------------------------------------------------------------

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            odds_min: self.markets.odds_min,
            odds_max: self.markets.odds_max,
            spread_ceiling_pct: self.markets.spread_ceiling_pct,
            tie_tolerance: self.markets.tie_tolerance,
        }
    }

    pub fn pick_config(&self) -> PickConfig {
        PickConfig {
            mode: self.filters.pick_mode,
            min_spread_pct: self.filters.min_spread_pct,
            deny_bookmakers: self.filters.deny_bookmakers.clone(),
            max_profit_pct: self.filters.max_profit_pct,
            min_profit_pct: self.filters.min_profit_pct,
            exclude_women: self.filters.exclude_women,
        }
    }

    pub fn ticket_config(&self) -> TicketConfig {
        let rule = match self.tickets.completion {
            CompletionKind::LegCount => CompletionRule::LegCount {
                legs: self.tickets.legs,
            },
            CompletionKind::Multiplier => CompletionRule::Multiplier {
                target: self.tickets.multiplier_target,
            },
        };
        TicketConfig {
            rule,
            leg_cap: self.tickets.leg_cap,
        }
    }

    pub fn bankroll_config(&self) -> BankrollConfig {
        BankrollConfig {
            stake: d(self.bankroll.stake),
            currency: self.bankroll.currency.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
[run]
reference_date = "2025-10-24"

[[sources]]
bookmaker = "Mozzart"
path = "dumps/mozzart.txt"

[[sources]]
bookmaker = "Meridian"
path = "dumps/meridian.txt"

[markets]
odds_min = 1.1
odds_max = 4.5

[filters]
pick_mode = "qualifying_legs"
deny_bookmakers = ["Soccer"]

[tickets]
completion = "multiplier"
multiplier_target = 2.5
leg_cap = 4

[bankroll]
stake = 150.0
currency = "EUR"
"#;

    #[test]
    fn test_parse_sample() {
        let cfg = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(cfg.run.reference_date, NaiveDate::from_ymd_opt(2025, 10, 24));
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.sources[1].bookmaker, "Meridian");
        assert_eq!(cfg.filters.pick_mode, PickMode::QualifyingLegs);
        assert_eq!(cfg.output.dir, PathBuf::from("output"));

        let agg = cfg.aggregator_config();
        assert_eq!(agg.odds_min, 1.1);
        assert_eq!(agg.spread_ceiling_pct, 60.0);

        let tickets = cfg.ticket_config();
        assert_eq!(tickets.rule, CompletionRule::Multiplier { target: 2.5 });
        assert_eq!(tickets.leg_cap, 4);

        let bank = cfg.bankroll_config();
        assert_eq!(bank.stake, dec!(150));
        assert_eq!(bank.currency, "EUR");

        assert_eq!(cfg.pick_config().deny_bookmakers, vec!["Soccer".to_string()]);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = AppConfig::parse("").unwrap();
        assert!(cfg.sources.is_empty());
        assert_eq!(cfg.ticket_config().rule, CompletionRule::LegCount { legs: 2 });
        assert_eq!(cfg.bankroll_config().stake, dec!(200));
        assert!(cfg.filters.exclude_women);
    }

    #[test]
    fn test_rejects_inverted_odds_range() {
        let err = AppConfig::parse("[markets]\nodds_min = 5.0\nodds_max = 2.0\n").unwrap_err();
        assert!(format!("{err:#}").contains("odds_min"));
    }

    #[test]
    fn test_rejects_bad_ticket_settings() {
        assert!(AppConfig::parse("[tickets]\nleg_cap = 1\n").is_err());
        assert!(AppConfig::parse("[tickets]\nlegs = 4\nleg_cap = 3\n").is_err());
        assert!(AppConfig::parse("[tickets]\ncompletion = \"multiplier\"\nmultiplier_target = 1.0\n").is_err());
        // Leg count is ignored under the multiplier rule.
        assert!(AppConfig::parse("[tickets]\ncompletion = \"multiplier\"\nlegs = 9\n").is_ok());
    }

    #[test]
    fn test_rejects_non_positive_stake() {
        let mut cfg = AppConfig::default();
        cfg.bankroll.stake = 0.0;
        assert!(matches!(cfg.validate(), Err(OddsError::Config(_))));
    }

    #[test]
    fn test_rejects_duplicate_sources() {
        let toml = "[[sources]]\nbookmaker = \"bk1\"\npath = \"a.txt\"\n\
                    [[sources]]\nbookmaker = \"BK1\"\npath = \"b.txt\"\n";
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_rejects_non_finite_numbers() {
        let err = AppConfig::parse("[markets]\nspread_ceiling_pct = nan\n").unwrap_err();
        assert!(format!("{err:#}").contains("markets.spread_ceiling_pct"));
        assert!(AppConfig::parse("[markets]\ntie_tolerance = nan\n").is_err());
        assert!(AppConfig::parse("[markets]\nodds_max = inf\n").is_err());
        assert!(AppConfig::parse("[filters]\nmin_spread_pct = nan\n").is_err());
        assert!(AppConfig::parse("[tickets]\ncompletion = \"multiplier\"\nmultiplier_target = nan\n").is_err());

        let mut cfg = AppConfig::default();
        cfg.bankroll.stake = f64::INFINITY;
        assert!(matches!(cfg.validate(), Err(OddsError::Config(_))));
        cfg.bankroll.stake = f64::NAN;
        assert!(matches!(cfg.validate(), Err(OddsError::Config(_))));
    }

    #[test]
    fn test_load_config() {
        let mut path = std::env::temp_dir();
        path.push(format!("oddsbridge_test_config_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, SAMPLE).unwrap();

        let cfg = AppConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.bankroll.stake, 150.0);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = AppConfig::load("/nonexistent/oddsbridge.toml").unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }
}
