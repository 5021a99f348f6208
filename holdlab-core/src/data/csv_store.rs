//! Local CSV close-history store.
//!
//! Layout: `{dir}/{TICKER}.csv` with a `date,close` header, plus a metadata
//! sidecar `{dir}/{TICKER}.meta.json`.
//!
//! Writes are atomic (write to .tmp, rename into place). The store doubles as
//! an offline `PriceSource`.

use super::provider::{CloseHistory, DataError, PriceSource};
use super::universe::TickerUniverse;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata sidecar for a stored ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub close_count: usize,
    pub source: String,
    pub stored_at: chrono::NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
struct CloseRecord {
    date: NaiveDate,
    close: f64,
}

pub struct CsvHistoryStore {
    dir: PathBuf,
    universe: TickerUniverse,
}

impl CsvHistoryStore {
    pub fn new(dir: impl Into<PathBuf>, universe: TickerUniverse) -> Self {
        Self {
            dir: dir.into(),
            universe,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }

    fn meta_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.meta.json"))
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.csv_path(ticker).is_file()
    }

    /// Write (replace) the stored history of `ticker`.
    pub fn write(&self, ticker: &str, history: &CloseHistory, source: &str) -> Result<(), DataError> {
        let (start_date, end_date) = match (history.keys().next(), history.keys().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return Err(DataError::CacheError(format!(
                    "refusing to store empty history for {ticker}"
                )))
            }
        };

        fs::create_dir_all(&self.dir)
            .map_err(|e| DataError::CacheError(format!("create {}: {e}", self.dir.display())))?;

        let path = self.csv_path(ticker);
        let tmp = path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)
                .map_err(|e| DataError::CacheError(format!("open {}: {e}", tmp.display())))?;
            for (&date, &close) in history {
                writer
                    .serialize(CloseRecord { date, close })
                    .map_err(|e| DataError::CacheError(format!("write {ticker}: {e}")))?;
            }
            writer
                .flush()
                .map_err(|e| DataError::CacheError(format!("flush {ticker}: {e}")))?;
        }
        fs::rename(&tmp, &path)
            .map_err(|e| DataError::CacheError(format!("rename {}: {e}", tmp.display())))?;

        let meta = StoreMeta {
            ticker: ticker.to_string(),
            start_date,
            end_date,
            close_count: history.len(),
            source: source.to_string(),
            stored_at: chrono::Local::now().naive_local(),
        };
        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("serialize meta for {ticker}: {e}")))?;
        fs::write(self.meta_path(ticker), json)
            .map_err(|e| DataError::CacheError(format!("write meta for {ticker}: {e}")))?;

        tracing::debug!(ticker, closes = history.len(), "stored close history");
        Ok(())
    }

    /// Read the stored history of `ticker`.
    pub fn load(&self, ticker: &str) -> Result<CloseHistory, DataError> {
        let path = self.csv_path(ticker);
        if !path.is_file() {
            return Err(DataError::NoCachedData {
                symbol: ticker.to_string(),
            });
        }

        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| DataError::CacheError(format!("open {}: {e}", path.display())))?;
        let mut history = CloseHistory::new();
        for record in reader.deserialize::<CloseRecord>() {
            let record = record
                .map_err(|e| DataError::CacheError(format!("parse {}: {e}", path.display())))?;
            history.insert(record.date, record.close);
        }
        Ok(history)
    }

    /// Metadata sidecar, if present and readable.
    pub fn meta(&self, ticker: &str) -> Option<StoreMeta> {
        let content = fs::read_to_string(self.meta_path(ticker)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Tickers with a stored history, sorted.
    pub fn tickers(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut tickers: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "csv") {
                    path.file_stem().map(|s| s.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        tickers.sort();
        tickers
    }
}

impl PriceSource for CsvHistoryStore {
    fn name(&self) -> &str {
        "csv_store"
    }

    fn validate(&self, ticker: &str) -> bool {
        self.universe.contains(ticker)
    }

    fn fetch_history(&self, ticker: &str) -> Result<CloseHistory, DataError> {
        self.load(ticker)
    }
}
