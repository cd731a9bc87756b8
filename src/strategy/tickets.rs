//! Ticket builder.
//!
//! Packs picks into bookmaker-homogeneous accumulator tickets. A ticket
//! never holds two legs from the same match group. Single legs left over at
//! the end are merged into the cheapest multi-leg ticket of the same
//! bookmaker that still has room, or kept as standalone orphans.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

use super::DecisionRecord;
use crate::types::{d, Pick};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// When a ticket counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CompletionRule {
    /// Done once it holds exactly this many legs.
    LegCount { legs: usize },
    /// Done once the product of leg odds reaches the target.
    Multiplier { target: f64 },
}

impl Default for CompletionRule {
    fn default() -> Self {
        CompletionRule::LegCount { legs: 2 }
    }
}

impl CompletionRule {
    pub fn is_met(&self, legs: &[Pick]) -> bool {
        match *self {
            CompletionRule::LegCount { legs: n } => legs.len() >= n,
            CompletionRule::Multiplier { target } => {
                !legs.is_empty() && product(legs) >= target
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TicketConfig {
    pub rule: CompletionRule,
    /// Hard cap on legs per ticket, orphan merges included.
    pub leg_cap: usize,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            rule: CompletionRule::default(),
            leg_cap: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Done,
    /// Closed without meeting the completion rule.
    Incomplete,
    /// Single leg with no merge host.
    Orphan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// 1-based, in order of creation.
    pub id: usize,
    pub bookmaker: String,
    pub legs: Vec<Pick>,
    pub status: TicketStatus,
    /// Position in the global completion order, for `Done` tickets only.
    pub completed_seq: Option<usize>,
}

impl Ticket {
    /// Product of leg odds.
    pub fn multiplier(&self) -> f64 {
        product(&self.legs)
    }

    pub fn payout(&self, stake: Decimal) -> Decimal {
        d(self.multiplier()) * stake
    }

    /// Mean of the legs' partition profits, ignoring legs without one.
    pub fn average_profit_pct(&self) -> Option<f64> {
        let profits: Vec<f64> = self.legs.iter().filter_map(|p| p.profit_pct).collect();
        if profits.is_empty() {
            return None;
        }
        Some(profits.iter().sum::<f64>() / profits.len() as f64)
    }

    pub fn contains_group(&self, group_id: usize) -> bool {
        self.legs.iter().any(|p| p.group_id == group_id)
    }

    pub fn is_done(&self) -> bool {
        self.status == TicketStatus::Done
    }
}

fn product(legs: &[Pick]) -> f64 {
    legs.iter().map(|p| p.odd).product()
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct TicketBuilder {
    config: TicketConfig,
}

/// Mutable state of one build pass.
struct Pass {
    tickets: Vec<Ticket>,
    decisions: Vec<DecisionRecord>,
    next_id: usize,
    next_seq: usize,
}

impl Pass {
    fn push(&mut self, bookmaker: &str, legs: Vec<Pick>, status: TicketStatus) -> usize {
        self.next_id += 1;
        let completed_seq = (status == TicketStatus::Done).then(|| self.take_seq());
        self.tickets.push(Ticket {
            id: self.next_id,
            bookmaker: bookmaker.to_string(),
            legs,
            status,
            completed_seq,
        });
        self.next_id
    }

    fn take_seq(&mut self) -> usize {
        self.next_seq += 1;
        self.next_seq
    }
}

impl TicketBuilder {
    pub fn new(config: TicketConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TicketConfig {
        &self.config
    }

    /// Pack picks into tickets. Bookmakers are handled in order of first
    /// appearance; within a bookmaker, picks keep their input order.
    pub fn build(&self, picks: &[Pick]) -> (Vec<Ticket>, Vec<DecisionRecord>) {
        let mut bookmakers: Vec<&str> = Vec::new();
        for p in picks {
            if !bookmakers.contains(&p.bookmaker.as_str()) {
                bookmakers.push(&p.bookmaker);
            }
        }

        let mut pass = Pass {
            tickets: Vec::new(),
            decisions: Vec::new(),
            next_id: 0,
            next_seq: 0,
        };

        for bookmaker in bookmakers {
            let queue: VecDeque<Pick> = picks
                .iter()
                .filter(|p| p.bookmaker == bookmaker)
                .cloned()
                .collect();
            let first_ticket = pass.tickets.len();
            let orphans = self.pack(bookmaker, queue, &mut pass);
            self.place_orphans(bookmaker, orphans, first_ticket, &mut pass);
        }

        info!(
            picks = picks.len(),
            tickets = pass.tickets.len(),
            done = pass.tickets.iter().filter(|t| t.is_done()).count(),
            orphans = pass.tickets.iter().filter(|t| t.status == TicketStatus::Orphan).count(),
            "Ticket building complete"
        );

        (pass.tickets, pass.decisions)
    }

    /// Fill tickets for one bookmaker. Returns single-leg leftovers.
    fn pack(&self, bookmaker: &str, mut queue: VecDeque<Pick>, pass: &mut Pass) -> Vec<Pick> {
        let mut orphans = Vec::new();
        let mut open: Vec<Pick> = Vec::new();

        while !queue.is_empty() {
            let next = queue
                .iter()
                .position(|p| !open.iter().any(|o| o.group_id == p.group_id));

            let Some(pos) = next else {
                // Everything left conflicts with the open ticket.
                self.close_partial(bookmaker, std::mem::take(&mut open), &mut orphans, pass);
                continue;
            };
            if pos > 0 {
                debug!(bookmaker, deferred = pos, "Deferring picks that share a group with the open ticket");
            }

            if let Some(pick) = queue.remove(pos) {
                open.push(pick);
            }

            if self.config.rule.is_met(&open) {
                pass.push(bookmaker, std::mem::take(&mut open), TicketStatus::Done);
            } else if open.len() >= self.config.leg_cap {
                pass.push(bookmaker, std::mem::take(&mut open), TicketStatus::Incomplete);
            }
        }

        self.close_partial(bookmaker, open, &mut orphans, pass);
        orphans
    }

    fn close_partial(&self, bookmaker: &str, legs: Vec<Pick>, orphans: &mut Vec<Pick>, pass: &mut Pass) {
        match legs.len() {
            0 => {}
            1 => orphans.extend(legs),
            _ => {
                pass.push(bookmaker, legs, TicketStatus::Incomplete);
            }
        }
    }

    /// Merge each orphan into the lowest-multiplier multi-leg ticket of the
    /// bookmaker that is under the cap and lacks the orphan's group.
    fn place_orphans(&self, bookmaker: &str, orphans: Vec<Pick>, first_ticket: usize, pass: &mut Pass) {
        for orphan in orphans {
            let host = pass.tickets[first_ticket..]
                .iter()
                .enumerate()
                .filter(|(_, t)| {
                    t.status != TicketStatus::Orphan
                        && t.legs.len() >= 2
                        && t.legs.len() < self.config.leg_cap
                        && !t.contains_group(orphan.group_id)
                })
                .min_by(|(_, a), (_, b)| {
                    a.multiplier()
                        .partial_cmp(&b.multiplier())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| first_ticket + i);

            match host {
                Some(idx) => {
                    let group_id = orphan.group_id;
                    pass.tickets[idx].legs.push(orphan);
                    let promote = pass.tickets[idx].status == TicketStatus::Incomplete
                        && self.config.rule.is_met(&pass.tickets[idx].legs);
                    if promote {
                        let seq = pass.take_seq();
                        let ticket = &mut pass.tickets[idx];
                        ticket.status = TicketStatus::Done;
                        ticket.completed_seq = Some(seq);
                    }
                    let host_ticket = pass.tickets[idx].id;
                    debug!(bookmaker, group = group_id, host_ticket, promoted = promote, "Orphan merged");
                    pass.decisions.push(DecisionRecord::OrphanMerged {
                        group_id,
                        bookmaker: bookmaker.to_string(),
                        host_ticket,
                        promoted: promote,
                    });
                }
                None => {
                    let group_id = orphan.group_id;
                    let ticket_id = pass.push(bookmaker, vec![orphan], TicketStatus::Orphan);
                    debug!(bookmaker, group = group_id, ticket_id, "Orphan left standalone");
                    pass.decisions.push(DecisionRecord::OrphanUnplaced {
                        group_id,
                        bookmaker: bookmaker.to_string(),
                        ticket_id,
                    });
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
