//! Ticker universe — the set of symbols considered valid.
//!
//! Stored as a TOML file of sectors and their member tickers:
//!
//! ```toml
//! [sectors]
//! Technology = ["AAPL", "MSFT"]
//! ETFs = ["SPY"]
//! ```
//!
//! Price series are only built for tickers found here.

use super::provider::DataError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerUniverse {
    pub sectors: BTreeMap<String, Vec<String>>,
}

impl TickerUniverse {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataError::Universe(format!("read universe file {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        toml::from_str(content).map_err(|e| DataError::Universe(format!("parse universe TOML: {e}")))
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self)
            .map_err(|e| DataError::Universe(format!("serialize universe: {e}")))
    }

    /// Whether `ticker` belongs to any sector.
    pub fn contains(&self, ticker: &str) -> bool {
        self.sectors
            .values()
            .any(|tickers| tickers.iter().any(|t| t == ticker))
    }

    /// All tickers across all sectors, sorted and de-duplicated.
    pub fn all_tickers(&self) -> BTreeSet<&str> {
        self.sectors
            .values()
            .flat_map(|tickers| tickers.iter().map(|t| t.as_str()))
            .collect()
    }

    /// Tickers for a specific sector.
    pub fn sector_tickers(&self, sector: &str) -> Option<&[String]> {
        self.sectors.get(sector).map(|v| v.as_slice())
    }

    pub fn ticker_count(&self) -> usize {
        self.all_tickers().len()
    }

    /// A default US equity universe with major sectors.
    pub fn default_us() -> Self {
        let sector = |tickers: &[&str]| tickers.iter().map(|t| t.to_string()).collect::<Vec<_>>();

        let mut sectors = BTreeMap::new();
        sectors.insert(
            "Technology".into(),
            sector(&[
                "AAPL", "MSFT", "GOOGL", "GOOG", "AMZN", "NVDA", "META", "AVGO", "CRM", "ADBE",
                "ORCL", "IBM", "INTC", "AMD",
            ]),
        );
        sectors.insert(
            "Healthcare".into(),
            sector(&["JNJ", "UNH", "PFE", "ABBV", "MRK", "LLY", "TMO", "ABT"]),
        );
        sectors.insert(
            "Finance".into(),
            sector(&["JPM", "BAC", "WFC", "GS", "MS", "BLK", "SCHW", "C", "AXP", "V"]),
        );
        sectors.insert(
            "Energy".into(),
            sector(&["XOM", "CVX", "COP", "SLB", "EOG", "MPC", "PSX", "VLO"]),
        );
        sectors.insert(
            "Consumer".into(),
            sector(&["WMT", "PG", "KO", "PEP", "COST", "HD", "MCD", "NKE", "SBUX", "TGT"]),
        );
        sectors.insert(
            "ETFs".into(),
            sector(&["SPY", "QQQ", "IWM", "DIA", "XLF", "XLE", "XLK", "XLV"]),
        );

        Self { sectors }
    }
}

impl Default for TickerUniverse {
    fn default() -> Self {
        Self::default_us()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_universe_contains_common_tickers() {
        let u = TickerUniverse::default_us();
        assert!(u.contains("AAPL"));
        assert!(u.contains("SPY"));
        assert!(!u.contains("aapl"));
        assert!(!u.contains("NOTREAL"));
        assert!(u.ticker_count() > 30);
    }

    #[test]
    fn toml_roundtrip_keeps_membership() {
        let u = TickerUniverse::default_us();
        let parsed = TickerUniverse::from_toml(&u.to_toml().unwrap()).unwrap();
        assert_eq!(u.all_tickers(), parsed.all_tickers());
    }

    #[test]
    fn parses_hand_written_file() {
        let u = TickerUniverse::from_toml(
            r#"
            [sectors]
            Tech = ["AAPL", "MSFT"]
            Funds = ["SPY", "AAPL"]
            "#,
        )
        .unwrap();
        assert_eq!(u.ticker_count(), 3);
        assert_eq!(u.sector_tickers("Tech").unwrap().len(), 2);
    }

    #[test]
    fn bad_toml_is_a_universe_error() {
        assert!(matches!(
            TickerUniverse::from_toml("sectors = 3"),
            Err(DataError::Universe(_))
        ));
    }
}
