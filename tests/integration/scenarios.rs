//! End-to-end scenarios: mock sources → loader → pipeline → artifacts.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;

use oddsbridge::config::AppConfig;
use oddsbridge::engine::{Pipeline, RunReport};
use oddsbridge::ingest::{load_all, QuoteSource};
use oddsbridge::market::Partition;
use oddsbridge::matching::same_team;
use oddsbridge::strategy::picks::RejectionReason;
use oddsbridge::strategy::DecisionRecord;
use oddsbridge::storage;
use oddsbridge::types::MarketKey;

use crate::mock_source::{block, MockSource};

// ---- helpers ---------------------------------------------------------------

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 20).unwrap()
}

async fn run(sources: Vec<MockSource>, config: &AppConfig) -> RunReport {
    let sources: Vec<Arc<dyn QuoteSource>> = sources
        .into_iter()
        .map(|s| Arc::new(s) as Arc<dyn QuoteSource>)
        .collect();
    let load = load_all(&sources).await;
    Pipeline::from_config(config, reference_date()).run(&load)
}

/// The three-bookmaker Havre vs Brest fixture with a 1X2 arbitrage.
fn arbitrage_sources() -> Vec<MockSource> {
    let header = "18:00  Pet  24.10.  [France 1]";
    vec![
        MockSource::with_blocks(
            "bk1",
            vec![block(header, "Havre", "Brest", &["1=2.10   X=3.40   2=3.60"])],
        ),
        MockSource::with_blocks(
            "bk2",
            vec![block(header, "Le Havre", "Stade Brest", &["1=2.05   X=3.50   2=3.70"])],
        ),
        MockSource::with_blocks(
            "bk3",
            vec![block(header, "Havre AC", "Brest", &["1=2.20   X=3.30   2=3.90"])],
        ),
    ]
}

fn check_ticket_invariants(report: &RunReport) {
    for ticket in &report.tickets {
        let groups: HashSet<usize> = ticket.legs.iter().map(|l| l.group_id).collect();
        assert_eq!(groups.len(), ticket.legs.len(), "ticket #{} repeats a group", ticket.id);
        assert!(ticket.legs.iter().all(|l| l.bookmaker == ticket.bookmaker));
    }

    let bank = &report.bankroll;
    assert!(bank.kept.iter().all(|t| t.is_done()));
    if let Some(min) = bank.min_payout {
        assert!(bank.stake * rust_decimal::Decimal::from(bank.kept.len()) <= min);
    } else {
        assert!(bank.kept.is_empty());
    }
}

// ---- scenarios -------------------------------------------------------------

#[tokio::test]
async fn test_three_bookmaker_arbitrage() {
    let report = run(arbitrage_sources(), &AppConfig::default()).await;

    assert_eq!(report.summary.groups, 1);
    assert_eq!(report.summary.arbs_match_result, 1);
    let analysis = &report.groups[0];
    assert_eq!(analysis.group.len(), 3);
    assert!(analysis
        .group
        .quotes
        .iter()
        .all(|q| q.kickoff_date == NaiveDate::from_ymd_opt(2025, 10, 24)));

    let home = analysis.summary(MarketKey::Home).unwrap();
    assert_eq!(home.best_value, Some(2.20));
    assert_eq!(home.best_bookmaker.as_deref(), Some("bk3"));
    let draw = analysis.summary(MarketKey::Draw).unwrap();
    assert_eq!(draw.best_value, Some(3.50));
    assert_eq!(draw.best_bookmaker.as_deref(), Some("bk2"));
    let away = analysis.summary(MarketKey::Away).unwrap();
    assert_eq!(away.best_value, Some(3.90));
    assert_eq!(away.best_bookmaker.as_deref(), Some("bk3"));

    let result = analysis.partition(Partition::MatchResult).unwrap();
    assert!(result.is_arbitrage());
    let profit = result.profit_pct().unwrap();
    assert!((profit - 0.34).abs() < 0.01);
    assert!(analysis.partition(Partition::Goals).unwrap().profit_pct().is_none());

    // Widest spread is `2` (3.60 → 3.90), taken at bk3.
    assert_eq!(report.picks.len(), 1);
    assert_eq!(report.picks[0].market, MarketKey::Away);
    assert_eq!(report.picks[0].bookmaker, "bk3");
    // A single pick cannot complete a double: it stays an orphan.
    assert_eq!(report.tickets.len(), 1);
    assert!(report.bankroll.kept.is_empty());
}

#[tokio::test]
async fn test_underspecified_quote_dropped() {
    let sources = vec![
        MockSource::with_blocks(
            "bk1",
            vec![
                block("18:00", "Havre", "Brest", &["1=2.10   X=3.40   2=3.60"]),
                block("20:00", "Lens", "Nantes", &["1=1.80"]),
            ],
        ),
        MockSource::with_blocks(
            "bk2",
            vec![block("20:00", "Lens", "Nantes", &["1=1.85   X=3.30   2=4.20"])],
        ),
    ];
    let report = run(sources, &AppConfig::default()).await;

    assert_eq!(report.diagnostics.underspecified, 1);
    assert_eq!(report.summary.groups, 2);
    let lens = report
        .groups
        .iter()
        .find(|a| a.group.home() == "Lens")
        .unwrap();
    assert_eq!(lens.group.len(), 1);
    assert_eq!(lens.group.quotes[0].bookmaker, "bk2");
    assert_eq!(report.summary.bookmakers[0].usable, 1);
}

#[tokio::test]
async fn test_aliases_join_across_languages() {
    assert!(same_team("Crvena Zvezda", "Red Star Belgrade"));

    let sources = vec![
        MockSource::with_blocks(
            "bk1",
            vec![block("20:00", "Crvena Zvezda", "Partizan", &["1=1.70   X=3.60   2=4.80"])],
        ),
        MockSource::with_blocks(
            "bk2",
            vec![block("20:00", "Red Star Belgrade", "FK Partizan", &["1=1.75   X=3.50   2=4.60"])],
        ),
        MockSource::with_blocks(
            "bk3",
            vec![block("21:00", "Red Star Belgrade", "FK Partizan", &["1=1.72   X=3.55   2=4.70"])],
        ),
    ];
    let report = run(sources, &AppConfig::default()).await;

    // Same names one hour later are a different fixture.
    assert_eq!(report.summary.groups, 2);
    assert_eq!(report.summary.paired_groups, 1);
    let paired = report.groups.iter().find(|a| a.group.is_paired()).unwrap();
    assert_eq!(paired.group.bookmakers().into_iter().collect::<Vec<_>>(), vec!["bk1", "bk2"]);
}

#[tokio::test]
async fn test_grouping_follows_the_opener() {
    assert!(same_team("Atletico Madrid", "Real Madrid"));
    assert!(same_team("Real Madrid", "Real Betis"));
    assert!(!same_team("Atletico Madrid", "Real Betis"));

    let odds = ["1=2.10   X=3.30   2=3.40"];
    let make = |first: &str, second: &str, third: &str| {
        vec![
            MockSource::with_blocks("bk1", vec![block("21:00", first, "Sevilla", &odds)]),
            MockSource::with_blocks("bk2", vec![block("21:00", second, "Sevilla", &odds)]),
            MockSource::with_blocks("bk3", vec![block("21:00", third, "Sevilla", &odds)]),
        ]
    };

    // Real Madrid opens and both neighbours join it.
    let report = run(make("Real Madrid", "Atletico Madrid", "Real Betis"), &AppConfig::default()).await;
    assert_eq!(report.summary.groups, 1);

    // Atletico opens; Real Betis shares nothing with the opener.
    let report = run(make("Atletico Madrid", "Real Madrid", "Real Betis"), &AppConfig::default()).await;
    assert_eq!(report.summary.groups, 2);
    for analysis in &report.groups {
        let times: HashSet<_> = analysis.group.quotes.iter().map(|q| q.kickoff_time).collect();
        assert_eq!(times.len(), 1);
    }
}

#[tokio::test]
async fn test_bankroll_bounds_the_pool() {
    let teams = [
        ("Havre", "Brest"),
        ("Lens", "Nantes"),
        ("Lyon", "Metz"),
        ("Nice", "Lille"),
        ("Rennes", "Reims"),
        ("Lorient", "Auxerre"),
    ];
    let mut bk1 = Vec::new();
    let mut bk2 = Vec::new();
    for (i, (home, away)) in teams.iter().enumerate() {
        let header = format!("{}:00", 14 + i);
        bk1.push(block(&header, home, away, &["1=2.30   X=3.30   2=3.50"]));
        bk2.push(block(&header, home, away, &["1=2.10   X=3.60   2=3.80"]));
    }
    let sources = vec![MockSource::with_blocks("bk1", bk1), MockSource::with_blocks("bk2", bk2)];
    let config = AppConfig::parse("[filters]\npick_mode = \"qualifying_legs\"\n").unwrap();

    let report = run(sources, &config).await;

    // Every 1X2 leg qualifies: `1` at bk1, `X` and `2` at bk2.
    assert_eq!(report.picks.len(), 18);
    check_ticket_invariants(&report);

    // The weakest double pays 2.30 × 2.30 × 200 = 1058, so five stakes fit.
    assert_eq!(report.bankroll.kept.len(), 5);
    assert!(report.bankroll.rejected_ticket.is_some());
    assert!(report
        .decisions
        .iter()
        .any(|d| matches!(d, DecisionRecord::BankrollRejected { .. })));
}

#[tokio::test]
async fn test_women_fixture_reported_but_not_picked() {
    let sources = vec![
        MockSource::with_blocks(
            "bk1",
            vec![block("16:00", "Havre Women", "Brest Women", &["1=2.30   X=3.30   2=3.50"])],
        ),
        MockSource::with_blocks(
            "bk2",
            vec![block("16:00", "Havre (W)", "Brest (W)", &["1=2.10   X=3.60   2=3.80"])],
        ),
    ];
    let report = run(sources, &AppConfig::default()).await;

    assert_eq!(report.summary.groups, 1);
    assert_eq!(report.summary.arbs_any, 1);
    assert!(report.picks.is_empty());
    assert!(report.decisions.iter().any(|d| matches!(
        d,
        DecisionRecord::PickRejected {
            reason: RejectionReason::WomenFixture,
            ..
        }
    )));
}

#[tokio::test]
async fn test_failed_source_is_skipped() {
    let sources = arbitrage_sources();
    sources[1].set_error("scraper crashed");

    let report = run(sources, &AppConfig::default()).await;

    assert_eq!(report.diagnostics.failed_sources.len(), 1);
    assert!(report.diagnostics.failed_sources[0].contains("bk2"));
    assert_eq!(report.summary.bookmakers.len(), 2);
    assert_eq!(report.groups[0].group.len(), 2);
}

#[tokio::test]
async fn test_artifacts_written() {
    let report = run(arbitrage_sources(), &AppConfig::default()).await;

    let mut dir = std::env::temp_dir();
    dir.push(format!("oddsbridge_it_{}", uuid::Uuid::new_v4()));
    storage::write_artifacts(&report, &dir).unwrap();

    let arbs = std::fs::read_to_string(dir.join(storage::ARBS_FILE)).unwrap();
    assert!(arbs.contains("Havre vs Brest"));
    assert!(arbs.contains("ARB"));
    let tickets = std::fs::read_to_string(dir.join(storage::TICKETS_FILE)).unwrap();
    assert!(tickets.contains("ORPHAN"));
    let json = storage::read_report(&dir.join(storage::REPORT_FILE)).unwrap();
    assert_eq!(json["summary"]["arbs_any"], 1);

    std::fs::remove_dir_all(&dir).unwrap();
}
