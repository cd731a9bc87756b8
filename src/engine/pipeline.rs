//! The reconciliation pipeline: dumps in, run report out.
//!
//! parse → drop under-specified → correlate → dedup → analyse → rank →
//! picks → tickets → bankroll.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::report::{Diagnostics, RunReport, RunSummary};
use crate::config::AppConfig;
use crate::ingest::parser::RecordParser;
use crate::ingest::SourceLoad;
use crate::market::{dedup_by_bookmaker, rank, GroupAnalysis, MarketAggregator};
use crate::matching::correlate;
use crate::strategy::bankroll::BankrollSelector;
use crate::strategy::picks::PickSelector;
use crate::strategy::tickets::TicketBuilder;
use crate::strategy::TicketStrategy;
use crate::types::Quote;

pub struct Pipeline {
    parser: RecordParser,
    aggregator: MarketAggregator,
    strategy: TicketStrategy,
}

impl Pipeline {
    pub fn new(parser: RecordParser, aggregator: MarketAggregator, strategy: TicketStrategy) -> Self {
        Self {
            parser,
            aggregator,
            strategy,
        }
    }

    /// Wire every stage from configuration. `reference_date` anchors year
    /// inference for kickoff dates.
    pub fn from_config(config: &AppConfig, reference_date: NaiveDate) -> Self {
        Self::new(
            RecordParser::new(reference_date),
            MarketAggregator::new(config.aggregator_config()),
            TicketStrategy::new(
                PickSelector::new(config.pick_config()),
                TicketBuilder::new(config.ticket_config()),
                BankrollSelector::new(config.bankroll_config()),
            ),
        )
    }

    /// Run every stage over the loaded dumps. Never fails: bad records are
    /// counted in the report's diagnostics.
    pub fn run(&self, load: &SourceLoad) -> RunReport {
        let mut diagnostics = Diagnostics {
            failed_sources: load.failed.iter().map(ToString::to_string).collect(),
            ..Diagnostics::default()
        };

        // Stage 1 – parse, keeping source order
        let mut quotes: Vec<Quote> = Vec::new();
        let mut usable: Vec<(String, usize)> = Vec::new();
        for dump in &load.dumps {
            let parsed = self.parser.parse_dump(&dump.bookmaker, &dump.text);
            diagnostics.blocks_seen += parsed.blocks_seen;
            diagnostics.malformed += parsed.malformed;

            // Stage 2 – drop quotes with fewer than two target markets
            let mut kept = 0;
            for quote in parsed.quotes {
                if quote.is_usable() {
                    kept += 1;
                    quotes.push(quote);
                } else {
                    debug!(quote = %quote, "Dropping under-specified quote");
                    diagnostics.underspecified += 1;
                }
            }
            usable.push((dump.bookmaker.clone(), kept));
        }
        info!(
            sources = load.dumps.len(),
            blocks = diagnostics.blocks_seen,
            malformed = diagnostics.malformed,
            underspecified = diagnostics.underspecified,
            usable = quotes.len(),
            "Parsing complete"
        );

        // Stage 3 – correlate
        let mut groups = correlate(quotes);

        // Stage 4 – dedup within each group
        for group in &mut groups {
            diagnostics.duplicates_pruned += dedup_by_bookmaker(group);
        }

        // Stage 5 – analyse and rank
        let mut analyses: Vec<GroupAnalysis> = groups
            .into_iter()
            .map(|g| GroupAnalysis::build(g, &self.aggregator))
            .collect();
        let summary = RunSummary::compute(&analyses, &usable);
        rank(&mut analyses);
        info!(
            groups = summary.groups,
            paired = summary.paired_groups,
            duplicates_pruned = diagnostics.duplicates_pruned,
            arbs = summary.arbs_any,
            "Market analysis complete"
        );

        // Stage 6 – picks, tickets and bankroll
        let (outcome, decisions) = self.strategy.run(&analyses);

        RunReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            reference_date: self.parser.reference_date(),
            diagnostics,
            summary,
            groups: analyses,
            picks: outcome.picks,
            tickets: outcome.tickets,
            bankroll: outcome.bankroll,
            decisions,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::SourceDump;

    const SEP: &str = "======================================================================";

    fn make_block(time: &str, home: &str, away: &str, odds: &str) -> String {
        format!("{time}  Pet  24.10.  [France 1]\n{home}  vs  {away}   (ID: 1)\n{odds}\n")
    }

    fn make_dump(bookmaker: &str, blocks: &[String]) -> SourceDump {
        let mut text = String::new();
        for block in blocks {
            text.push_str(SEP);
            text.push('\n');
            text.push_str(block);
        }
        SourceDump {
            bookmaker: bookmaker.to_string(),
            text,
        }
    }

    fn make_pipeline() -> Pipeline {
        let reference = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        Pipeline::from_config(&AppConfig::default(), reference)
    }

    #[test]
    fn test_empty_load() {
        let report = make_pipeline().run(&SourceLoad::default());
        assert_eq!(report.summary.groups, 0);
        assert!(report.groups.is_empty());
        assert!(report.tickets.is_empty());
        assert_eq!(report.diagnostics, Diagnostics::default());
    }

    #[test]
    fn test_diagnostics_are_counted() {
        let bk1 = make_dump(
            "bk1",
            &[
                make_block("18:00", "Havre", "Brest", "1=2.10   X=3.40   2=3.60"),
                make_block("20:00", "Lens", "Nantes", "1=1.80   X=-   2=-"),
                "garbage without a header\n".to_string(),
            ],
        );
        let bk2 = make_dump(
            "bk2",
            &[
                make_block("18:00", "Le Havre", "Brest", "1=2.05   X=3.50   2=3.70"),
                make_block("18:00", "Havre AC", "Brest", "1=2.00   X=3.45   2=3.75"),
            ],
        );
        let load = SourceLoad {
            dumps: vec![bk1, bk2],
            failed: Vec::new(),
        };

        let report = make_pipeline().run(&load);

        assert_eq!(report.diagnostics.blocks_seen, 5);
        assert_eq!(report.diagnostics.malformed, 1);
        assert_eq!(report.diagnostics.underspecified, 1);
        assert_eq!(report.diagnostics.duplicates_pruned, 1);
        assert_eq!(report.summary.groups, 1);
        assert_eq!(report.summary.paired_groups, 1);
        assert_eq!(report.groups[0].group.len(), 2);

        let bk1_stats = &report.summary.bookmakers[0];
        assert_eq!((bk1_stats.usable, bk1_stats.in_paired_groups), (1, 1));
        let bk2_stats = &report.summary.bookmakers[1];
        assert_eq!((bk2_stats.usable, bk2_stats.in_paired_groups), (2, 1));
    }
}
