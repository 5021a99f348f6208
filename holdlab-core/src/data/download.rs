//! Fetch orchestrator — pulls close histories from a source into the CSV store.

use super::csv_store::CsvHistoryStore;
use super::provider::{DataError, DownloadProgress, PriceSource};

/// Fetch several tickers from `source` and store each in `store`.
///
/// Unless `force` is set, tickers already present in the store are skipped.
/// A failure on one ticker does not stop the batch.
pub fn download_histories(
    source: &dyn PriceSource,
    store: &CsvHistoryStore,
    tickers: &[&str],
    force: bool,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = tickers.len();
    let mut succeeded = 0;
    let mut failed = 0;
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(ticker, i, total);

        if !force && store.contains(ticker) {
            let closes = store.meta(ticker).map_or(0, |m| m.close_count);
            progress.on_complete(ticker, i, total, &Ok(closes));
            succeeded += 1;
            continue;
        }

        let result = download_single(source, store, ticker);
        progress.on_complete(ticker, i, total, &result);

        match result {
            Ok(_) => succeeded += 1,
            Err(e) => {
                errors.push((ticker.to_string(), e));
                failed += 1;
            }
        }
    }

    progress.on_batch_complete(succeeded, failed, total);

    DownloadSummary {
        total,
        succeeded,
        failed,
        errors,
    }
}

/// Fetch → store for one ticker; returns the number of closes stored.
fn download_single(
    source: &dyn PriceSource,
    store: &CsvHistoryStore,
    ticker: &str,
) -> Result<usize, DataError> {
    if !source.validate(ticker) {
        return Err(DataError::UnknownTicker {
            symbol: ticker.to_string(),
        });
    }
    let history = source.fetch_history(ticker)?;
    store.write(ticker, &history, source.name())?;
    Ok(history.len())
}

/// Summary of a batch fetch.
#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
