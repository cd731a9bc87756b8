//! Core engine: the single-pass pipeline and its run report.

pub mod pipeline;
pub mod report;

pub use pipeline::Pipeline;
pub use report::{BookmakerStats, Diagnostics, RunReport, RunSummary};
