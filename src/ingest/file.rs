//! File-backed quote source.
//!
//! Each scraper writes its bookmaker's listings to a `*_mecevi_pregled.txt`
//! style dump. A missing file simply means the scraper produced nothing
//! this run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::info;

use super::QuoteSource;

pub struct FileSource {
    bookmaker: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(bookmaker: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            bookmaker: bookmaker.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl QuoteSource for FileSource {
    fn bookmaker(&self) -> &str {
        &self.bookmaker
    }

    async fn fetch_dump(&self) -> Result<String> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    bookmaker = %self.bookmaker,
                    path = %self.path.display(),
                    "Dump file not found, treating as empty"
                );
                Ok(String::new())
            }
            Err(e) => Err(e).with_context(|| {
                format!("Failed to read dump for {} from {}", self.bookmaker, self.path.display())
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
