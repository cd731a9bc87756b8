//! ODDSBRIDGE: cross-bookmaker odds reconciliation
//!
//! Entry point. Loads configuration, initialises structured logging, reads
//! every configured bookmaker dump concurrently, runs the pipeline once and
//! writes the run artifacts.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use oddsbridge::config::AppConfig;
use oddsbridge::engine::pipeline::Pipeline;
use oddsbridge::engine::report::RunReport;
use oddsbridge::ingest::file::FileSource;
use oddsbridge::ingest::{load_all, QuoteSource};
use oddsbridge::storage;

const BANNER: &str = r#"
  ___  ____  ____  ____  ____  ____  ___ ____   ____ _____
 / _ \|  _ \|  _ \/ ___|| __ )|  _ \|_ _|  _ \ / ___| ____|
| | | | | | | | | \___ \|  _ \| |_) || || | | | |  _|  _|
| |_| | |_| | |_| |___) | |_) |  _ < | || |_| | |_| | |___
 \___/|____/|____/|____/|____/|_| \_\___|____/ \____|_____|

  Cross-bookmaker odds reconciliation and ticket building
  v0.1.0
"#;

#[derive(Debug, Parser)]
#[command(name = "oddsbridge", version, about)]
struct Args {
    /// Path to the TOML configuration.
    #[arg(long, env = "ODDSBRIDGE_CONFIG", default_value = "config.toml")]
    config: String,

    /// Overrides `output.dir`.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Reference date for kickoff year inference (YYYY-MM-DD). Overrides
    /// `run.reference_date`; defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let args = Args::parse();
    let cfg = AppConfig::load(&args.config)?;

    init_logging();

    println!("{BANNER}");

    let reference_date = args
        .date
        .or(cfg.run.reference_date)
        .unwrap_or_else(|| Local::now().date_naive());
    let output_dir = args.output_dir.clone().unwrap_or_else(|| cfg.output.dir.clone());

    info!(
        config = %args.config,
        sources = cfg.sources.len(),
        reference_date = %reference_date,
        output_dir = %output_dir.display(),
        stake = cfg.bankroll.stake,
        currency = %cfg.bankroll.currency,
        "ODDSBRIDGE starting up"
    );

    // -- Load sources ----------------------------------------------------

    let sources: Vec<Arc<dyn QuoteSource>> = cfg
        .sources
        .iter()
        .map(|s| Arc::new(FileSource::new(s.bookmaker.clone(), s.path.clone())) as Arc<dyn QuoteSource>)
        .collect();
    if sources.is_empty() {
        warn!("No sources configured, the run will be empty");
    }
    let load = load_all(&sources).await;

    // -- Run -------------------------------------------------------------

    let pipeline = Pipeline::from_config(&cfg, reference_date);
    let report = pipeline.run(&load);
    log_run_report(&report);

    storage::write_artifacts(&report, &output_dir)?;

    info!(run_id = %report.run_id, "ODDSBRIDGE finished");
    Ok(())
}

fn log_run_report(report: &RunReport) {
    let s = &report.summary;
    let diag = &report.diagnostics;
    let bank = &report.bankroll;

    info!(
        run_id = %report.run_id,
        groups = s.groups,
        paired = s.paired_groups,
        arbs_1x2 = s.arbs_match_result,
        arbs_goals = s.arbs_goals,
        arbs_any = s.arbs_any,
        "Run summary"
    );
    info!(
        blocks = diag.blocks_seen,
        malformed = diag.malformed,
        underspecified = diag.underspecified,
        duplicates_pruned = diag.duplicates_pruned,
        failed_sources = diag.failed_sources.len(),
        "Diagnostics"
    );
    info!(
        picks = report.picks.len(),
        tickets = report.tickets.len(),
        staked = bank.kept.len(),
        total_stake = format!("{} {}", bank.total_stake, bank.currency),
        total_payout = format!("{} {}", bank.total_payout.round_dp(2), bank.currency),
        rejected = ?bank.rejected_ticket,
        "Tickets"
    );
    for failed in &diag.failed_sources {
        warn!(error = %failed, "Source skipped");
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("oddsbridge=info"));

    let json_logging = std::env::var("ODDSBRIDGE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
