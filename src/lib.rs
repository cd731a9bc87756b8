//! ODDSBRIDGE: cross-bookmaker odds reconciliation
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod ingest;
pub mod matching;
pub mod market;
pub mod strategy;
pub mod engine;
pub mod storage;
