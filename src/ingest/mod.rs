//! Quote ingestion.
//!
//! Defines the `QuoteSource` trait implemented by every bookmaker feed and
//! the concurrent loader that gathers their dumps:
//! - `FileSource`: reads a pretty-printed dump written by a scraper
//! - `parser`: turns dumps into `Quote`s

pub mod file;
pub mod parser;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::types::OddsError;

/// Abstraction over a bookmaker's pretty-printed odds dump.
///
/// Acquisition (browser automation, scrolling, clipboard capture) happens
/// outside this crate; implementors only hand over the finished text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Bookmaker label attached to every quote from this source.
    fn bookmaker(&self) -> &str;

    /// Fetch the full dump. An empty string means "nothing published".
    async fn fetch_dump(&self) -> Result<String>;
}

/// Raw text from one source, labelled with its bookmaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDump {
    pub bookmaker: String,
    pub text: String,
}

/// Outcome of loading every configured source.
#[derive(Debug, Default)]
pub struct SourceLoad {
    /// Successful dumps, in source order.
    pub dumps: Vec<SourceDump>,
    pub failed: Vec<OddsError>,
}

/// Fetch all sources concurrently. Failures are logged and skipped; the
/// surviving dumps keep the order of `sources`.
pub async fn load_all(sources: &[Arc<dyn QuoteSource>]) -> SourceLoad {
    let fetches = sources.iter().map(|s| s.fetch_dump());
    let results = futures::future::join_all(fetches).await;

    let mut load = SourceLoad::default();
    for (source, result) in sources.iter().zip(results) {
        let bookmaker = source.bookmaker().to_string();
        match result {
            Ok(text) => {
                info!(bookmaker = %bookmaker, bytes = text.len(), "Source loaded");
                load.dumps.push(SourceDump { bookmaker, text });
            }
            Err(e) => {
                warn!(bookmaker = %bookmaker, error = %e, "Source failed, skipping");
                load.failed.push(OddsError::Source {
                    bookmaker,
                    message: format!("{e:#}"),
                });
            }
        }
    }

    load
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
