//! Strategy: pick selection, ticket packing and bankroll trimming.

pub mod bankroll;
pub mod picks;
pub mod tickets;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::market::GroupAnalysis;
use crate::types::{MarketKey, Pick};
use bankroll::{BankrollReport, BankrollSelector};
use picks::{PickSelector, RejectionReason};
use tickets::{Ticket, TicketBuilder};

// ---------------------------------------------------------------------------
// Decision log
// ---------------------------------------------------------------------------

/// Record of every decision made (or skipped) during a strategy pass,
/// including candidates that were passed on and the reason why.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DecisionRecord {
    PickSelected {
        pick: Pick,
    },
    PickRejected {
        group_id: usize,
        match_description: String,
        /// `None` when the whole group was rejected.
        market: Option<MarketKey>,
        reason: RejectionReason,
    },
    /// A leftover pick joined an existing ticket of its bookmaker.
    OrphanMerged {
        group_id: usize,
        bookmaker: String,
        host_ticket: usize,
        /// The merge completed the host ticket.
        promoted: bool,
    },
    /// A leftover pick found no host and stands alone.
    OrphanUnplaced {
        group_id: usize,
        bookmaker: String,
        ticket_id: usize,
    },
    /// Admitting this ticket would have made the pool unsustainable.
    BankrollRejected {
        ticket_id: usize,
        bookmaker: String,
        payout: Decimal,
        pool_stake: Decimal,
    },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StrategyOutcome {
    pub picks: Vec<Pick>,
    pub tickets: Vec<Ticket>,
    pub bankroll: BankrollReport,
}

/// Pipelines pick selection → ticket packing → bankroll selection.
pub struct TicketStrategy {
    picks: PickSelector,
    builder: TicketBuilder,
    bankroll: BankrollSelector,
}

impl TicketStrategy {
    pub fn new(picks: PickSelector, builder: TicketBuilder, bankroll: BankrollSelector) -> Self {
        Self {
            picks,
            builder,
            bankroll,
        }
    }

    /// Run the strategy over ranked analyses.
    ///
    /// Returns the outcome of every stage and a decision log covering all
    /// rejected picks, orphan placements and the bankroll cut.
    pub fn run(&self, analyses: &[GroupAnalysis]) -> (StrategyOutcome, Vec<DecisionRecord>) {
        let (picks, mut decisions) = self.picks.select(analyses);

        let (tickets, ticket_decisions) = self.builder.build(&picks);
        decisions.extend(ticket_decisions);

        let bankroll = self.bankroll.select(&tickets);
        if let Some(id) = bankroll.rejected_ticket {
            if let Some(ticket) = tickets.iter().find(|t| t.id == id) {
                decisions.push(DecisionRecord::BankrollRejected {
                    ticket_id: id,
                    bookmaker: ticket.bookmaker.clone(),
                    payout: ticket.payout(bankroll.stake).round_dp(2),
                    pool_stake: bankroll.stake * Decimal::from(bankroll.kept.len() + 1),
                });
            }
        }

        info!(
            groups = analyses.len(),
            picks = picks.len(),
            tickets = tickets.len(),
            staked = bankroll.kept.len(),
            "Strategy pass complete"
        );

        (
            StrategyOutcome {
                picks,
                tickets,
                bankroll,
            },
            decisions,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{AggregatorConfig, MarketAggregator};
    use crate::matching::MatchGroup;
    use crate::strategy::bankroll::BankrollConfig;
    use crate::strategy::picks::PickConfig;
    use crate::strategy::tickets::{TicketConfig, TicketStatus};
    use crate::types::Quote;
    use chrono::NaiveTime;
    use rust_decimal_macros::dec;

    fn make_quote(bookmaker: &str, home: &str, away: &str, markets: &[(MarketKey, f64)]) -> Quote {
        Quote {
            bookmaker: bookmaker.to_string(),
            kickoff_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            kickoff_date: None,
            day: None,
            league: None,
            home: home.to_string(),
            away: away.to_string(),
            match_id: None,
            markets: markets.iter().copied().collect(),
        }
    }

    /// A two-bookmaker group with a 2.4% 1X2 arbitrage and the widest
    /// spread on `1` at bk1.
    fn make_analysis(id: usize, home: &str, away: &str) -> GroupAnalysis {
        use MarketKey::*;
        let agg = MarketAggregator::new(AggregatorConfig::default());
        let quotes = vec![
            make_quote("bk1", home, away, &[(Home, 2.30), (Draw, 3.30), (Away, 3.50)]),
            make_quote("bk2", home, away, &[(Home, 2.10), (Draw, 3.60), (Away, 3.80)]),
        ];
        GroupAnalysis::build(MatchGroup { id, quotes }, &agg)
    }

    fn make_strategy(stake: Decimal) -> TicketStrategy {
        TicketStrategy::new(
            PickSelector::new(PickConfig::default()),
            TicketBuilder::new(TicketConfig::default()),
            BankrollSelector::new(BankrollConfig {
                stake,
                currency: "RSD".to_string(),
            }),
        )
    }

    #[test]
    fn test_empty_run() {
        let (outcome, decisions) = make_strategy(dec!(200)).run(&[]);
        assert!(outcome.picks.is_empty());
        assert!(outcome.tickets.is_empty());
        assert!(outcome.bankroll.kept.is_empty());
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_picks_flow_into_tickets_and_bankroll() {
        let analyses = vec![
            make_analysis(1, "Havre", "Brest"),
            make_analysis(2, "Lens", "Nantes"),
            make_analysis(3, "Lyon", "Metz"),
            make_analysis(4, "Nice", "Lille"),
        ];
        let (outcome, decisions) = make_strategy(dec!(200)).run(&analyses);

        assert_eq!(outcome.picks.len(), 4);
        assert!(outcome.picks.iter().all(|p| p.bookmaker == "bk1" && p.market == MarketKey::Home));
        // Two complete doubles at bk1, each paying 2.3 × 2.3 × 200 = 1058.
        assert_eq!(outcome.tickets.len(), 2);
        assert!(outcome.tickets.iter().all(|t| t.status == TicketStatus::Done));
        assert_eq!(outcome.bankroll.kept.len(), 2);
        assert!(outcome.bankroll.is_sustainable());

        let selected = decisions
            .iter()
            .filter(|d| matches!(d, DecisionRecord::PickSelected { .. }))
            .count();
        assert_eq!(selected, 4);
    }

    #[test]
    fn test_bankroll_cut_is_logged() {
        let analyses: Vec<GroupAnalysis> = (1..=12)
            .map(|i| make_analysis(i, &format!("Home{i}"), &format!("Away{i}")))
            .collect();
        let (outcome, decisions) = make_strategy(dec!(200)).run(&analyses);

        // Six doubles each paying 5.29 × stake: the sixth stake breaks the pool.
        assert_eq!(outcome.tickets.len(), 6);
        assert_eq!(outcome.bankroll.kept.len(), 5);
        assert_eq!(outcome.bankroll.rejected_ticket, Some(6));
        assert!(decisions.iter().any(|d| matches!(
            d,
            DecisionRecord::BankrollRejected { ticket_id: 6, pool_stake, .. } if *pool_stake == dec!(1200)
        )));
    }

    #[test]
    fn test_decision_record_serializes_with_tag() {
        let record = DecisionRecord::OrphanUnplaced {
            group_id: 3,
            bookmaker: "bk1".to_string(),
            ticket_id: 7,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["decision"], "orphan_unplaced");
        assert_eq!(json["ticket_id"], 7);
    }
}
