//! Bankroll selector.
//!
//! Trims finished tickets to a pool the stake can sustain: the total
//! outlay must never exceed what the weakest kept ticket pays out, so that
//! any single winning ticket covers the whole pool.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::tickets::Ticket;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BankrollConfig {
    /// Flat stake per ticket.
    pub stake: Decimal,
    pub currency: String,
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            stake: Decimal::from(200),
            currency: "RSD".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BankrollReport {
    pub stake: Decimal,
    pub currency: String,
    pub kept: Vec<Ticket>,
    /// Id of the ticket whose admission broke the invariant, if any.
    pub rejected_ticket: Option<usize>,
    /// Done tickets never considered because selection stopped early.
    pub not_considered: usize,
    pub per_bookmaker: BTreeMap<String, usize>,
    pub total_stake: Decimal,
    pub min_payout: Option<Decimal>,
    pub total_payout: Decimal,
}

impl BankrollReport {
    /// `count × stake ≤ min payout`, or nothing kept.
    pub fn is_sustainable(&self) -> bool {
        match self.min_payout {
            Some(min) => self.total_stake <= min,
            None => self.kept.is_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

pub struct BankrollSelector {
    config: BankrollConfig,
}

impl BankrollSelector {
    pub fn new(config: BankrollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BankrollConfig {
        &self.config
    }

    /// Admit `Done` tickets in completion order until the pool's total
    /// stake would exceed the smallest payout. The ticket that breaks the
    /// invariant is rejected and selection stops.
    pub fn select(&self, tickets: &[Ticket]) -> BankrollReport {
        let stake = self.config.stake;

        let mut done: Vec<&Ticket> = tickets.iter().filter(|t| t.is_done()).collect();
        done.sort_by_key(|t| t.completed_seq);

        let mut kept: Vec<Ticket> = Vec::new();
        let mut min_payout: Option<Decimal> = None;
        let mut rejected_ticket = None;
        let mut considered = 0;

        for ticket in &done {
            considered += 1;
            let payout = ticket.payout(stake);
            let candidate_min = min_payout.map_or(payout, |m: Decimal| m.min(payout));
            let outlay = stake * Decimal::from(kept.len() + 1);

            if outlay > candidate_min {
                warn!(
                    ticket = ticket.id,
                    bookmaker = %ticket.bookmaker,
                    outlay = %outlay,
                    min_payout = %candidate_min.round_dp(2),
                    "Ticket rejected, pool would exceed the weakest payout"
                );
                rejected_ticket = Some(ticket.id);
                break;
            }

            min_payout = Some(candidate_min);
            kept.push((*ticket).clone());
        }

        let mut per_bookmaker = BTreeMap::new();
        for t in &kept {
            *per_bookmaker.entry(t.bookmaker.clone()).or_insert(0) += 1;
        }
        let total_payout = kept.iter().map(|t| t.payout(stake)).sum();

        let report = BankrollReport {
            stake,
            currency: self.config.currency.clone(),
            total_stake: stake * Decimal::from(kept.len()),
            not_considered: done.len() - considered,
            kept,
            rejected_ticket,
            per_bookmaker,
            min_payout,
            total_payout,
        };

        info!(
            done = done.len(),
            kept = report.kept.len(),
            rejected = ?report.rejected_ticket,
            total_stake = %report.total_stake,
            currency = %report.currency,
            "Bankroll selection complete"
        );

        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
