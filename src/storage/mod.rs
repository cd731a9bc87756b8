//! Run artifacts.
//!
//! Writes the full report as pretty JSON next to three text renders:
//! ranked groups, arbitrage-only groups and tickets.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::report::RunReport;
use crate::types::OddsError;

pub const REPORT_FILE: &str = "run_report.json";
pub const GROUPS_FILE: &str = "groups.txt";
pub const ARBS_FILE: &str = "arbs.txt";
pub const TICKETS_FILE: &str = "tickets.txt";

/// Write every artifact of a run into `dir`, creating it if needed.
/// Returns the paths written.
pub fn write_artifacts(report: &RunReport, dir: &Path) -> Result<Vec<PathBuf>> {
    if dir.exists() && !dir.is_dir() {
        return Err(OddsError::Storage(format!("Output path {} is not a directory", dir.display())).into());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let json = serde_json::to_string_pretty(report).context("Failed to serialise run report")?;
    let groups = report.render_groups().context("Failed to render groups")?;
    let arbs = report.render_arbs().context("Failed to render arbitrage groups")?;
    let tickets = report.render_tickets().context("Failed to render tickets")?;

    let mut written = Vec::new();
    for (name, contents) in [
        (REPORT_FILE, json),
        (GROUPS_FILE, groups),
        (ARBS_FILE, arbs),
        (TICKETS_FILE, tickets),
    ] {
        let path = dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    info!(
        dir = %dir.display(),
        run_id = %report.run_id,
        groups = report.groups.len(),
        tickets = report.tickets.len(),
        "Artifacts written"
    );
    Ok(written)
}

/// Read back a previously written JSON report as a generic value.
pub fn read_report(path: &Path) -> Result<serde_json::Value> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report from {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse report from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
