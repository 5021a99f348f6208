//! Price source trait and structured error types.
//!
//! The PriceSource trait abstracts over where close histories come from (Yahoo
//! Finance, a local CSV store, test fixtures) so the core never reaches for a
//! global market-data client.

use crate::domain::PortfolioError;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

/// Ordered date → close mapping as delivered by a source.
pub type CloseHistory = BTreeMap<NaiveDate, f64>;

/// Structured error types for market-data operations.
///
/// These are designed to be displayable in CLI output.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("unknown ticker '{symbol}' (not in the ticker universe)")]
    UnknownTicker { symbol: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("no cached data for symbol '{symbol}' — run `fetch {symbol}` first")]
    NoCachedData { symbol: String },

    #[error("universe error: {0}")]
    Universe(String),

    #[error(transparent)]
    Series(#[from] PortfolioError),

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for close-price sources.
///
/// Implementations handle the specifics of one source. Caching of built
/// series sits above this trait in `PriceBook`.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Whether `ticker` is a tradable symbol this source recognizes.
    fn validate(&self, ticker: &str) -> bool;

    /// Full daily close history for `ticker`, oldest first.
    fn fetch_history(&self, ticker: &str) -> Result<CloseHistory, DataError>;
}

/// Progress callback for multi-ticker operations.
pub trait DownloadProgress: Send {
    /// Called when starting to fetch a ticker.
    fn on_start(&self, ticker: &str, index: usize, total: usize);

    /// Called when a ticker fetch completes.
    fn on_complete(&self, ticker: &str, index: usize, total: usize, result: &Result<usize, DataError>);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl DownloadProgress for StdoutProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {ticker}...", index + 1, total);
    }

    fn on_complete(
        &self,
        ticker: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(closes) => println!("  OK: {ticker} ({closes} closes)"),
            Err(e) => println!("  FAIL: {ticker}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nFetch complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
