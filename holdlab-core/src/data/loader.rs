//! Store-first price source.
//!
//! Resolution order for a ticker:
//! 1. The local CSV store, when it has the ticker
//! 2. The upstream source (if any), with the result written back to the store
//! 3. `NoCachedData`

use super::csv_store::CsvHistoryStore;
use super::provider::{CloseHistory, DataError, PriceSource};

pub struct StoreFirstSource {
    store: CsvHistoryStore,
    upstream: Option<Box<dyn PriceSource>>,
}

impl StoreFirstSource {
    /// Read from `store`, falling back to `upstream` for missing tickers.
    pub fn new(store: CsvHistoryStore, upstream: Box<dyn PriceSource>) -> Self {
        Self {
            store,
            upstream: Some(upstream),
        }
    }

    /// Never touch the network.
    pub fn offline(store: CsvHistoryStore) -> Self {
        Self {
            store,
            upstream: None,
        }
    }

    pub fn store(&self) -> &CsvHistoryStore {
        &self.store
    }
}

impl PriceSource for StoreFirstSource {
    fn name(&self) -> &str {
        match &self.upstream {
            Some(upstream) => upstream.name(),
            None => self.store.name(),
        }
    }

    fn validate(&self, ticker: &str) -> bool {
        match &self.upstream {
            Some(upstream) => upstream.validate(ticker),
            None => self.store.validate(ticker),
        }
    }

    fn fetch_history(&self, ticker: &str) -> Result<CloseHistory, DataError> {
        if self.store.contains(ticker) {
            match self.store.load(ticker) {
                Ok(history) => return Ok(history),
                Err(e) => tracing::warn!(ticker, error = %e, "stored history unreadable"),
            }
        }

        let Some(upstream) = &self.upstream else {
            return Err(DataError::NoCachedData {
                symbol: ticker.to_string(),
            });
        };

        let history = upstream.fetch_history(ticker)?;
        if let Err(e) = self.store.write(ticker, &history, upstream.name()) {
            // the fetched history is still usable for this run
            tracing::warn!(ticker, error = %e, "could not store fetched history");
        }
        Ok(history)
    }
}
