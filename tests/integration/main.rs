//! Integration tests: in-memory sources driven through the full pipeline.

mod mock_source;
mod scenarios;
