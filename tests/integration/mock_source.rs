//! Mock quote source for integration testing.
//!
//! Provides a deterministic `QuoteSource` that renders a dump from blocks
//! held in memory, counts fetches and can be forced to fail.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use oddsbridge::ingest::QuoteSource;

/// Line written between blocks, as the scrapers do.
pub const SEPARATOR: &str = "======================================================================";

/// A mock bookmaker feed. All state is in-memory and controllable from
/// test code.
pub struct MockSource {
    bookmaker: String,
    blocks: Arc<Mutex<Vec<String>>>,
    fetches: Arc<Mutex<usize>>,
    /// If set, fetches return this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockSource {
    pub fn new(bookmaker: &str) -> Self {
        Self {
            bookmaker: bookmaker.to_string(),
            blocks: Arc::new(Mutex::new(Vec::new())),
            fetches: Arc::new(Mutex::new(0)),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_blocks(bookmaker: &str, blocks: Vec<String>) -> Self {
        let source = Self::new(bookmaker);
        *source.blocks.lock().unwrap() = blocks;
        source
    }

    pub fn push_block(&self, block: String) {
        self.blocks.lock().unwrap().push(block);
    }

    /// Force subsequent fetches to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl QuoteSource for MockSource {
    fn bookmaker(&self) -> &str {
        &self.bookmaker
    }

    async fn fetch_dump(&self) -> Result<String> {
        *self.fetches.lock().unwrap() += 1;
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }

        let mut dump = String::new();
        for block in self.blocks.lock().unwrap().iter() {
            dump.push_str(SEPARATOR);
            dump.push('\n');
            dump.push_str(block);
            if !block.ends_with('\n') {
                dump.push('\n');
            }
        }
        Ok(dump)
    }
}

/// Render one block: header, teams line and the given odds lines.
pub fn block(header: &str, home: &str, away: &str, odds: &[&str]) -> String {
    let mut out = format!("{header}\n{home}  vs  {away}   (ID: 1000)\n");
    for line in odds {
        out.push_str(line);
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_renders_separated_blocks() {
        let source = MockSource::with_blocks(
            "bk1",
            vec![
                block("18:00", "Havre", "Brest", &["1=2.10   X=3.40   2=3.60"]),
                block("20:00", "Lens", "Nantes", &["1=1.90   X=3.30   2=4.10"]),
            ],
        );
        let dump = source.fetch_dump().await.unwrap();
        assert_eq!(dump.matches(SEPARATOR).count(), 2);
        assert!(dump.contains("Havre  vs  Brest"));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_forced_error() {
        let source = MockSource::new("bk1");
        source.push_block(block("18:00", "Havre", "Brest", &["1=2.10 X=3.40"]));
        source.set_error("simulated scraper crash");
        assert!(source.fetch_dump().await.is_err());

        source.clear_error();
        assert!(source.fetch_dump().await.is_ok());
        assert_eq!(source.fetch_count(), 2);
    }
}
