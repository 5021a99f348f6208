//! PriceBook — builds price series from an injected source and shares them.

use super::provider::{DataError, PriceSource};
use crate::domain::PriceSeries;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache of shared, read-only price series keyed by ticker.
///
/// A series is fetched once per ticker. Appending a close is copy-on-write:
/// ledgers that already hold a handle keep the history they were given, and
/// later lookups see the extended series.
pub struct PriceBook {
    source: Box<dyn PriceSource>,
    series: HashMap<String, Arc<PriceSeries>>,
}

impl PriceBook {
    pub fn new(source: Box<dyn PriceSource>) -> Self {
        Self {
            source,
            series: HashMap::new(),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn is_valid_ticker(&self, ticker: &str) -> bool {
        self.source.validate(ticker)
    }

    /// The shared series for `ticker`, fetching it on first use.
    ///
    /// The ticker is validated before any fetch; an invalid ticker fails with
    /// `InvalidTicker`.
    pub fn series(&mut self, ticker: &str) -> Result<Arc<PriceSeries>, DataError> {
        if let Some(series) = self.series.get(ticker) {
            return Ok(Arc::clone(series));
        }

        let source = &self.source;
        if !source.validate(ticker) {
            return Err(crate::domain::PortfolioError::InvalidTicker {
                ticker: ticker.to_string(),
            }
            .into());
        }
        let history = source.fetch_history(ticker)?;
        let series = PriceSeries::new(ticker, history, |t| source.validate(t))?;

        tracing::debug!(ticker, closes = series.len(), source = source.name(), "loaded price series");
        let series = Arc::new(series);
        self.series.insert(ticker.to_string(), Arc::clone(&series));
        Ok(series)
    }

    /// Register an already-built series, replacing any cached one.
    pub fn insert(&mut self, series: PriceSeries) -> Arc<PriceSeries> {
        let series = Arc::new(series);
        self.series
            .insert(series.ticker().to_string(), Arc::clone(&series));
        series
    }

    /// Append a close to the cached series of `ticker`.
    pub fn append_closing(
        &mut self,
        ticker: &str,
        price: f64,
        date: NaiveDate,
    ) -> Result<Arc<PriceSeries>, DataError> {
        let mut series = self.series(ticker)?;
        Arc::make_mut(&mut series).add_closing(price, date)?;
        self.series.insert(ticker.to_string(), Arc::clone(&series));
        Ok(series)
    }

    /// Tickers loaded so far, sorted.
    pub fn loaded_tickers(&self) -> Vec<&str> {
        let mut tickers: Vec<&str> = self.series.keys().map(|s| s.as_str()).collect();
        tickers.sort_unstable();
        tickers
    }
}
