//! Client — the owner of a set of named ledgers.

use super::error::PortfolioError;
use super::portfolio::{LedgerKey, Portfolio};
use crate::data::PriceBook;
use crate::snapshot::{self, SnapshotError, SNAPSHOT_EXTENSION};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// An owner of portfolios. Ledger names are unique per client, so every
/// ledger it holds has a distinct `LedgerKey`.
///
/// Snapshot files that failed to load are remembered by file name. Their
/// ledger names stay reserved and `save_portfolios` never writes over them.
#[derive(Debug, Clone)]
pub struct Client {
    name: String,
    portfolios: BTreeMap<String, Portfolio>,
    unreadable: BTreeSet<String>,
}

/// Outcome of loading a snapshot directory.
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub loaded: Vec<String>,
    pub failed: Vec<(PathBuf, SnapshotError)>,
}

impl LoadSummary {
    pub fn all_loaded(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            portfolios: BTreeMap::new(),
            unreadable: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create an empty ledger owned by this client.
    pub fn create_portfolio(&mut self, name: &str) -> Result<&mut Portfolio, PortfolioError> {
        validate_name(name)?;
        if self.portfolios.contains_key(name)
            || self.unreadable.contains(&snapshot::file_name(name))
        {
            return Err(PortfolioError::DuplicatePortfolio {
                name: name.to_string(),
            });
        }
        let key = LedgerKey::new(self.name.clone(), name);
        Ok(self
            .portfolios
            .entry(name.to_string())
            .or_insert_with(|| Portfolio::new(key)))
    }

    pub fn portfolio(&self, name: &str) -> Option<&Portfolio> {
        self.portfolios.get(name)
    }

    pub fn portfolio_mut(&mut self, name: &str) -> Option<&mut Portfolio> {
        self.portfolios.get_mut(name)
    }

    /// Like [`portfolio`](Self::portfolio) but fails with `UnknownPortfolio`.
    pub fn require(&self, name: &str) -> Result<&Portfolio, PortfolioError> {
        self.portfolio(name)
            .ok_or_else(|| PortfolioError::UnknownPortfolio {
                name: name.to_string(),
            })
    }

    pub fn require_mut(&mut self, name: &str) -> Result<&mut Portfolio, PortfolioError> {
        self.portfolios
            .get_mut(name)
            .ok_or_else(|| PortfolioError::UnknownPortfolio {
                name: name.to_string(),
            })
    }

    pub fn portfolio_names(&self) -> Vec<&str> {
        self.portfolios.keys().map(|s| s.as_str()).collect()
    }

    /// File names of snapshots that failed their most recent load.
    pub fn unreadable_snapshots(&self) -> impl Iterator<Item = &str> {
        self.unreadable.iter().map(|s| s.as_str())
    }

    /// Write one snapshot file per ledger into `dir`.
    ///
    /// A ledger whose file failed to load is not written, so the unread
    /// snapshot is kept as it is on disk.
    pub fn save_portfolios(&self, dir: &Path) -> Result<Vec<PathBuf>, SnapshotError> {
        std::fs::create_dir_all(dir).map_err(|source| SnapshotError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut written = Vec::with_capacity(self.portfolios.len());
        for portfolio in self.portfolios.values() {
            let file_name = snapshot::file_name(portfolio.name());
            if self.unreadable.contains(&file_name) {
                tracing::warn!(
                    portfolio = %portfolio.key(),
                    file = %file_name,
                    "not overwriting a snapshot that failed to load"
                );
                continue;
            }
            let path = dir.join(file_name);
            snapshot::save(portfolio, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Load every snapshot in `dir`, replacing same-named ledgers.
    ///
    /// A file that fails to parse or replay is skipped and reported; the
    /// ledger it would have replaced is left as it was.
    pub fn load_portfolios(
        &mut self,
        dir: &Path,
        book: &mut PriceBook,
    ) -> Result<LoadSummary, SnapshotError> {
        let io_err = |source| SnapshotError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file() && p.extension().is_some_and(|ext| ext == SNAPSHOT_EXTENSION)
            })
            .collect();
        paths.sort();

        let mut summary = LoadSummary::default();
        for path in paths {
            let file_name = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            match snapshot::load(&path, &self.name, |ticker| book.series(ticker)) {
                Ok(portfolio) => {
                    self.unreadable.remove(&file_name);
                    let name = portfolio.name().to_string();
                    self.portfolios.insert(name.clone(), portfolio);
                    summary.loaded.push(name);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping snapshot");
                    self.unreadable.insert(file_name);
                    summary.failed.push((path, e));
                }
            }
        }
        Ok(summary)
    }
}

fn validate_name(name: &str) -> Result<(), PortfolioError> {
    let bad = name.trim().is_empty()
        || name
            .chars()
            .any(|c| matches!(c, '\n' | '\r' | ':' | '/' | '\\'));
    if bad {
        Err(PortfolioError::InvalidName {
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}
