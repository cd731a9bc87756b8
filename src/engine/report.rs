//! Run report: everything one pipeline pass produced, plus the text
//! renders written next to the JSON artifact.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use uuid::Uuid;

use crate::market::{ArbitrageOutcome, GroupAnalysis, Partition};
use crate::strategy::bankroll::BankrollReport;
use crate::strategy::tickets::{Ticket, TicketStatus};
use crate::strategy::DecisionRecord;
use crate::types::Pick;

/// Group sizes reported as "at least n bookmakers".
pub const SIZE_THRESHOLDS: std::ops::RangeInclusive<usize> = 3..=7;

// ---------------------------------------------------------------------------
// Report model
// ---------------------------------------------------------------------------

/// Counters for records that never made it into a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub blocks_seen: usize,
    pub malformed: usize,
    /// Parsed quotes with fewer than two target markets.
    pub underspecified: usize,
    /// Same-bookmaker duplicates removed from groups.
    pub duplicates_pruned: usize,
    pub failed_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookmakerStats {
    pub bookmaker: String,
    pub usable: usize,
    /// Quotes sitting in groups listed by at least two bookmakers.
    pub in_paired_groups: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub groups: usize,
    pub paired_groups: usize,
    /// Threshold → number of groups with at least that many quotes.
    pub groups_at_least: BTreeMap<usize, usize>,
    pub bookmakers: Vec<BookmakerStats>,
    pub arbs_match_result: usize,
    pub arbs_goals: usize,
    pub arbs_any: usize,
}

impl RunSummary {
    /// Compute the summary from the analysed groups. `usable` lists the
    /// bookmakers in source order with their usable quote counts.
    pub fn compute(analyses: &[GroupAnalysis], usable: &[(String, usize)]) -> Self {
        let groups_at_least = SIZE_THRESHOLDS
            .map(|n| (n, analyses.iter().filter(|a| a.group.len() >= n).count()))
            .collect();

        let bookmakers = usable
            .iter()
            .map(|(bookmaker, count)| BookmakerStats {
                bookmaker: bookmaker.clone(),
                usable: *count,
                in_paired_groups: analyses
                    .iter()
                    .filter(|a| a.group.is_paired())
                    .flat_map(|a| a.group.quotes.iter())
                    .filter(|q| &q.bookmaker == bookmaker)
                    .count(),
            })
            .collect();

        let arbs_in = |p: Partition| {
            analyses
                .iter()
                .filter(|a| a.partition(p).is_some_and(|r| r.is_arbitrage()))
                .count()
        };

        Self {
            groups: analyses.len(),
            paired_groups: analyses.iter().filter(|a| a.group.is_paired()).count(),
            groups_at_least,
            bookmakers,
            arbs_match_result: arbs_in(Partition::MatchResult),
            arbs_goals: arbs_in(Partition::Goals),
            arbs_any: analyses.iter().filter(|a| a.has_arbitrage()).count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub reference_date: NaiveDate,
    pub diagnostics: Diagnostics,
    pub summary: RunSummary,
    /// Ranked by headline profit.
    pub groups: Vec<GroupAnalysis>,
    pub picks: Vec<Pick>,
    pub tickets: Vec<Ticket>,
    pub bankroll: BankrollReport,
    pub decisions: Vec<DecisionRecord>,
}

// ---------------------------------------------------------------------------
// Text renders
// ---------------------------------------------------------------------------

impl RunReport {
    /// Groups with at least one arbitrage, in ranking order.
    pub fn arbitrage_groups(&self) -> impl Iterator<Item = &GroupAnalysis> {
        self.groups.iter().filter(|a| a.has_arbitrage())
    }

    pub fn render_groups(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        self.write_header(&mut out)?;
        self.write_summary(&mut out)?;
        writeln!(out)?;
        for analysis in &self.groups {
            write_group(&mut out, analysis)?;
        }
        Ok(out)
    }

    pub fn render_arbs(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        self.write_header(&mut out)?;
        writeln!(out, "Arbitrage groups: {}", self.summary.arbs_any)?;
        writeln!(out)?;
        for analysis in self.arbitrage_groups() {
            write_group(&mut out, analysis)?;
        }
        Ok(out)
    }

    pub fn render_tickets(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        let bank = &self.bankroll;
        self.write_header(&mut out)?;
        writeln!(
            out,
            "Picks: {}  Tickets: {}  Staked: {}  Stake: {} {}",
            self.picks.len(),
            self.tickets.len(),
            bank.kept.len(),
            bank.stake,
            bank.currency
        )?;
        writeln!(
            out,
            "Total stake: {} {}  Min payout: {}  Total payout: {} {}",
            bank.total_stake,
            bank.currency,
            bank.min_payout
                .map(|m| format!("{} {}", m.round_dp(2), bank.currency))
                .unwrap_or_else(|| "-".to_string()),
            bank.total_payout.round_dp(2),
            bank.currency
        )?;
        if !bank.per_bookmaker.is_empty() {
            let per: Vec<String> = bank
                .per_bookmaker
                .iter()
                .map(|(bk, n)| format!("{bk}={n}"))
                .collect();
            writeln!(out, "Per bookmaker: {}", per.join("  "))?;
        }
        if let Some(id) = bank.rejected_ticket {
            writeln!(out, "Ticket #{id} rejected: pool stake would exceed the weakest payout")?;
        }
        writeln!(out)?;

        for ticket in &self.tickets {
            let staked = bank.kept.iter().any(|k| k.id == ticket.id);
            self.write_ticket(&mut out, ticket, staked)?;
        }
        Ok(out)
    }

    fn write_header(&self, out: &mut String) -> fmt::Result {
        writeln!(
            out,
            "Run {}  generated {}  reference date {}",
            self.run_id,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.reference_date
        )
    }

    fn write_summary(&self, out: &mut String) -> fmt::Result {
        let s = &self.summary;
        let diag = &self.diagnostics;
        writeln!(
            out,
            "Groups: {}  Paired: {}  Arbs: 1-X-2={} 0-2/3+={} any={}",
            s.groups, s.paired_groups, s.arbs_match_result, s.arbs_goals, s.arbs_any
        )?;
        let sizes: Vec<String> = s
            .groups_at_least
            .iter()
            .map(|(n, count)| format!(">={n}: {count}"))
            .collect();
        writeln!(out, "Group sizes: {}", sizes.join("  "))?;
        for bk in &s.bookmakers {
            writeln!(
                out,
                "  {:<16} usable={:<5} paired={}",
                bk.bookmaker, bk.usable, bk.in_paired_groups
            )?;
        }
        writeln!(
            out,
            "Blocks: {}  Malformed: {}  Underspecified: {}  Duplicates pruned: {}",
            diag.blocks_seen, diag.malformed, diag.underspecified, diag.duplicates_pruned
        )?;
        for failed in &diag.failed_sources {
            writeln!(out, "  source failed: {failed}")?;
        }
        Ok(())
    }

    fn write_ticket(&self, out: &mut String, ticket: &Ticket, staked: bool) -> fmt::Result {
        let stake = self.bankroll.stake;
        let status = match ticket.status {
            TicketStatus::Done if staked => "STAKED",
            TicketStatus::Done => "done",
            TicketStatus::Incomplete => "incomplete",
            TicketStatus::Orphan => "ORPHAN",
        };
        let profit = ticket
            .average_profit_pct()
            .map(|p| format!("{p:+.2}%"))
            .unwrap_or_else(|| "n/a".to_string());
        writeln!(
            out,
            "Ticket #{} [{}] {}  legs={}  x{:.2}  stake={} payout={} {}  avg profit {}",
            ticket.id,
            ticket.bookmaker,
            status,
            ticket.legs.len(),
            ticket.multiplier(),
            stake,
            ticket.payout(stake).round_dp(2),
            self.bankroll.currency,
            profit
        )?;
        for leg in &ticket.legs {
            let leg_profit = leg
                .profit_pct
                .map(|p| format!("{p:+.2}%"))
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(
                out,
                "    {}  {} @ {:.2}  spread {:.2}%  profit {}",
                leg.match_description, leg.market, leg.odd, leg.spread_pct, leg_profit
            )?;
        }
        writeln!(out)
    }
}

fn write_group(out: &mut String, analysis: &GroupAnalysis) -> fmt::Result {
    let group = &analysis.group;
    writeln!(
        out,
        "#{}  {}  [{} quotes, {} bookmakers]",
        group.id,
        group.description(),
        group.len(),
        group.bookmakers().len()
    )?;
    for quote in &group.quotes {
        writeln!(out, "    {:<16} {}", quote.bookmaker, quote.markets_line())?;
    }

    let best: Vec<String> = analysis
        .summaries
        .iter()
        .filter(|s| s.has_data())
        .map(|s| {
            format!(
                "{}={:.2} ({}, {:.2}%)",
                s.market,
                s.best_value.unwrap_or_default(),
                s.best_bookmaker.as_deref().unwrap_or("-"),
                s.spread_pct
            )
        })
        .collect();
    if !best.is_empty() {
        writeln!(out, "    best: {}", best.join("  "))?;
    }

    for result in &analysis.arbitrage {
        match result.outcome {
            ArbitrageOutcome::InsufficientData => {
                writeln!(out, "    {}: insufficient data", result.partition)?;
            }
            ArbitrageOutcome::Evaluated {
                inverse_sum,
                is_arbitrage,
                profit_pct,
            } => {
                writeln!(
                    out,
                    "    {}: inverse {:.4}  profit {:+.2}%{}",
                    result.partition,
                    inverse_sum,
                    profit_pct,
                    if is_arbitrage { "  ARB" } else { "" }
                )?;
            }
        }
    }
    writeln!(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
