//! Ledger snapshot files.
//!
//! Format, one ledger per file:
//!
//! ```text
//! name:<ledger name>
//! stocks:
//! ticker:<TICKER>:quantity:<signed decimal>:dateAdded:<yyyy-MM-dd>
//! ```
//!
//! One `ticker:` line per stored delta entry. Loading replays each line in file
//! order as an add (positive quantity) or a remove (negative quantity) against a
//! fresh ledger, so a snapshot that violates ledger rules fails to load instead
//! of producing an impossible state.

use crate::data::DataError;
use crate::domain::{LedgerKey, Portfolio, PortfolioError, PriceSeries, QUANTITY_EPSILON};
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const SNAPSHOT_EXTENSION: &str = "txt";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("snapshot line {line}: {source}")]
    Ledger {
        line: usize,
        #[source]
        source: PortfolioError,
    },

    #[error("snapshot line {line}: {source}")]
    Data {
        line: usize,
        #[source]
        source: DataError,
    },
}

/// One `ticker:` line.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub line: usize,
    pub ticker: String,
    pub quantity: f64,
    pub date: NaiveDate,
}

/// A parsed but not yet replayed snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSnapshot {
    pub name: String,
    pub entries: Vec<SnapshotEntry>,
}

/// File name for a ledger: spaces become underscores.
pub fn file_name(portfolio_name: &str) -> String {
    format!("{}.{SNAPSHOT_EXTENSION}", portfolio_name.replace(' ', "_"))
}

/// Render a ledger in snapshot format.
pub fn render(portfolio: &Portfolio) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "name:{}", portfolio.name());
    out.push_str("stocks:\n");
    for (ticker, date, quantity) in portfolio.entries() {
        // `{:?}` keeps a trailing `.0` and round-trips every f64 exactly
        let _ = writeln!(
            out,
            "ticker:{ticker}:quantity:{quantity:?}:dateAdded:{}",
            date.format(DATE_FORMAT)
        );
    }
    out
}

/// Parse snapshot text.
pub fn parse(text: &str) -> Result<ParsedSnapshot, SnapshotError> {
    let mut name = None;
    let mut entries = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim_end();
        if raw.is_empty() || raw == "stocks:" {
            continue;
        }
        if let Some(rest) = raw.strip_prefix("name:") {
            name = Some(rest.to_string());
        } else if raw.starts_with("ticker:") {
            entries.push(parse_entry(line, raw)?);
        } else {
            return Err(SnapshotError::Malformed {
                line,
                reason: format!("unrecognized line '{raw}'"),
            });
        }
    }

    let name = name.ok_or_else(|| SnapshotError::Malformed {
        line: 1,
        reason: "missing 'name:' header".into(),
    })?;
    Ok(ParsedSnapshot { name, entries })
}

fn parse_entry(line: usize, raw: &str) -> Result<SnapshotEntry, SnapshotError> {
    let malformed = |reason: String| SnapshotError::Malformed { line, reason };

    let parts: Vec<&str> = raw.split(':').collect();
    match parts.as_slice() {
        ["ticker", ticker, "quantity", quantity, "dateAdded", date] => {
            if ticker.is_empty() {
                return Err(malformed("empty ticker".into()));
            }
            let quantity: f64 = quantity
                .parse()
                .map_err(|e| malformed(format!("bad quantity '{quantity}': {e}")))?;
            if !quantity.is_finite() {
                return Err(malformed(format!("bad quantity '{quantity}'")));
            }
            let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
                .map_err(|e| malformed(format!("bad date '{date}': {e}")))?;
            Ok(SnapshotEntry {
                line,
                ticker: ticker.to_string(),
                quantity,
                date,
            })
        }
        _ => Err(malformed(format!("expected 6 ':'-separated fields in '{raw}'"))),
    }
}

/// Replay a parsed snapshot into a fresh ledger owned by `owner`.
///
/// `resolve` supplies the price series for each ticker. Lines whose quantity
/// is zero (or floating-point residue of a net-zero day) carry no event and
/// are skipped.
pub fn replay<F>(
    parsed: &ParsedSnapshot,
    owner: &str,
    mut resolve: F,
) -> Result<Portfolio, SnapshotError>
where
    F: FnMut(&str) -> Result<Arc<PriceSeries>, DataError>,
{
    let mut portfolio = Portfolio::new(LedgerKey::new(owner, parsed.name.clone()));
    for entry in &parsed.entries {
        if entry.quantity.abs() < QUANTITY_EPSILON {
            continue;
        }
        let series = resolve(&entry.ticker).map_err(|source| SnapshotError::Data {
            line: entry.line,
            source,
        })?;
        let applied = if entry.quantity > 0.0 {
            portfolio.add_stock(&series, entry.quantity, entry.date)
        } else {
            portfolio.remove_stock(&series, -entry.quantity, entry.date)
        };
        applied.map_err(|source| SnapshotError::Ledger {
            line: entry.line,
            source,
        })?;
    }
    Ok(portfolio)
}

/// Write a ledger to `path` atomically (temp file, then rename).
pub fn save(portfolio: &Portfolio, path: &Path) -> Result<(), SnapshotError> {
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    let tmp = path.with_extension(format!("{SNAPSHOT_EXTENSION}.tmp"));
    fs::write(&tmp, render(portfolio)).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    tracing::debug!(portfolio = %portfolio.key(), path = %path.display(), "saved snapshot");
    Ok(())
}

/// Read and replay a snapshot file.
pub fn load<F>(path: &Path, owner: &str, resolve: F) -> Result<Portfolio, SnapshotError>
where
    F: FnMut(&str) -> Result<Arc<PriceSeries>, DataError>,
{
    let text = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse(&text)?;
    replay(&parsed, owner, resolve)
}
