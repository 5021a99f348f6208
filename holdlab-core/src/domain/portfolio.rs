//! Portfolio — the event-sourced holdings ledger.
//!
//! There is no stored "current quantity". Each holding is a date-bucketed map
//! of signed quantity deltas and every read sums the deltas up to the query
//! date. That is what makes as-of quantities and values possible for any
//! historical date.

use super::error::PortfolioError;
use super::price_series::PriceSeries;
use super::{round2, QUANTITY_EPSILON};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

/// Composite identity of a ledger: owner name plus ledger name.
///
/// Ledgers are looked up by key only. Two ledgers with the same key but
/// different holdings are not interchangeable, so `Portfolio` itself does not
/// implement `PartialEq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerKey {
    pub owner: String,
    pub name: String,
}

impl LedgerKey {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One instrument's delta history.
#[derive(Debug, Clone)]
pub(crate) struct Holding {
    pub(crate) series: Arc<PriceSeries>,
    pub(crate) deltas: BTreeMap<NaiveDate, f64>,
}

impl Holding {
    pub(crate) fn total(&self) -> f64 {
        self.deltas.values().sum()
    }

    fn quantity_as_of(&self, date: NaiveDate) -> f64 {
        self.deltas.range(..=date).map(|(_, q)| q).sum()
    }

    /// Shares that can be disposed of on `date`: the lowest running sum at
    /// `date` or at any later stored date.
    pub(crate) fn available_from(&self, date: NaiveDate) -> f64 {
        let mut running = self.quantity_as_of(date);
        let mut lowest = running;
        for (_, delta) in self.deltas.range((Bound::Excluded(date), Bound::Unbounded)) {
            running += delta;
            lowest = lowest.min(running);
        }
        lowest
    }
}

/// A named ledger of signed quantity deltas per instrument.
///
/// Price series are shared read-only through `Arc`; the ledger never mutates
/// a series it references.
#[derive(Debug, Clone)]
pub struct Portfolio {
    key: LedgerKey,
    pub(crate) holdings: BTreeMap<String, Holding>,
}

impl Portfolio {
    /// Create an empty ledger. Owners normally go through `Client::create_portfolio`.
    pub fn new(key: LedgerKey) -> Self {
        Self {
            key,
            holdings: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &LedgerKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn owner(&self) -> &str {
        &self.key.owner
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Every instrument that has ever been recorded, in ticker order.
    pub fn instruments(&self) -> impl Iterator<Item = &Arc<PriceSeries>> {
        self.holdings.values().map(|h| &h.series)
    }

    /// Stored `(ticker, date, delta)` entries, ticker order then date order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, NaiveDate, f64)> {
        self.holdings.iter().flat_map(|(ticker, holding)| {
            holding
                .deltas
                .iter()
                .map(move |(&date, &delta)| (ticker.as_str(), date, delta))
        })
    }

    /// Whether `ticker` has a delta recorded exactly on `date`.
    pub fn has_entry_on(&self, ticker: &str, date: NaiveDate) -> bool {
        self.holdings
            .get(ticker)
            .is_some_and(|h| h.deltas.contains_key(&date))
    }

    /// Record an acquisition of `quantity` shares on `date`.
    ///
    /// Same-date events merge into one delta. The ledger keeps the series
    /// handle passed most recently for the instrument.
    pub fn add_stock(
        &mut self,
        series: &Arc<PriceSeries>,
        quantity: f64,
        date: NaiveDate,
    ) -> Result<(), PortfolioError> {
        check_quantity(quantity)?;

        let holding = self
            .holdings
            .entry(series.ticker().to_string())
            .or_insert_with(|| Holding {
                series: Arc::clone(series),
                deltas: BTreeMap::new(),
            });
        holding.series = Arc::clone(series);
        *holding.deltas.entry(date).or_insert(0.0) += quantity;

        tracing::debug!(
            portfolio = %self.key,
            ticker = series.ticker(),
            quantity,
            %date,
            "added shares"
        );
        Ok(())
    }

    /// Record a disposal of `quantity` shares on `date`.
    ///
    /// A flat position fails with `NoHoldings`. Otherwise the sale must fit
    /// within the running quantity on `date` and on every later stored date,
    /// so no as-of position is ever driven negative.
    pub fn remove_stock(
        &mut self,
        series: &PriceSeries,
        quantity: f64,
        date: NaiveDate,
    ) -> Result<(), PortfolioError> {
        check_quantity(quantity)?;

        let ticker = series.ticker();
        let holding =
            self.holdings
                .get_mut(ticker)
                .ok_or_else(|| PortfolioError::UnknownInstrument {
                    ticker: ticker.to_string(),
                })?;

        let total = holding.total();
        if total.abs() < QUANTITY_EPSILON {
            return Err(PortfolioError::NoHoldings {
                ticker: Some(ticker.to_string()),
            });
        }
        let available = holding.available_from(date);
        if available - quantity < -QUANTITY_EPSILON {
            return Err(PortfolioError::InsufficientHoldings {
                ticker: ticker.to_string(),
                held: available,
                requested: quantity,
            });
        }

        *holding.deltas.entry(date).or_insert(0.0) -= quantity;

        tracing::debug!(
            portfolio = %self.key,
            ticker,
            quantity,
            %date,
            "removed shares"
        );
        Ok(())
    }

    /// Net quantity of `ticker` as of `date` (0 for an unknown ticker).
    pub fn quantity_as_of(&self, ticker: &str, date: NaiveDate) -> f64 {
        self.holdings
            .get(ticker)
            .map_or(0.0, |h| h.quantity_as_of(date))
    }

    /// Net quantity of `ticker` over every recorded date.
    pub fn total_quantity(&self, ticker: &str) -> f64 {
        self.holdings.get(ticker).map_or(0.0, Holding::total)
    }

    /// Positive as-of positions, rounded to 2 decimals, in ticker order.
    pub fn stocks(&self, date: NaiveDate) -> BTreeMap<String, f64> {
        self.holdings
            .iter()
            .filter_map(|(ticker, holding)| {
                let quantity = round2(holding.quantity_as_of(date));
                (quantity > 0.0).then(|| (ticker.clone(), quantity))
            })
            .collect()
    }

    /// Value of one position as of `date`, rounded to 2 decimals.
    ///
    /// A zero position is worth zero without a price lookup. A positive
    /// position whose price cannot be resolved fails with `NoPriceData`.
    pub fn stock_value(&self, ticker: &str, date: NaiveDate) -> Result<f64, PortfolioError> {
        let holding =
            self.holdings
                .get(ticker)
                .ok_or_else(|| PortfolioError::UnknownInstrument {
                    ticker: ticker.to_string(),
                })?;
        let quantity = holding.quantity_as_of(date);
        if quantity.abs() < QUANTITY_EPSILON {
            return Ok(0.0);
        }
        let close = holding.series.closing_price(date)?;
        Ok(round2(quantity * close))
    }

    /// Total value as of `date`.
    ///
    /// Sums the already-rounded per-instrument values and leaves the sum
    /// unrounded.
    pub fn portfolio_value(&self, date: NaiveDate) -> Result<f64, PortfolioError> {
        let mut total = 0.0;
        for (ticker, holding) in &self.holdings {
            if holding.quantity_as_of(date) > QUANTITY_EPSILON {
                total += self.stock_value(ticker, date)?;
            }
        }
        Ok(total)
    }

    /// Per-instrument value breakdown as printable lines.
    pub fn distribution_of_value(&self, date: NaiveDate) -> Result<String, PortfolioError> {
        let total = self.portfolio_value(date)?;
        if total == 0.0 {
            return Ok(format!("The portfolio has no value on {date}"));
        }

        let mut out = format!("Distribution of value on {date}:\n");
        for ticker in self.holdings.keys() {
            let value = self.stock_value(ticker, date)?;
            if value > 0.0 {
                out.push_str(&format!("{ticker}: ${value:.2}\n"));
            }
        }
        out.push_str(&format!("Total Portfolio Value: ${total:.2}"));
        Ok(out)
    }

    /// Holdings listing: `'<name>'` then `{TICKER, qty; ...}`.
    pub fn print_stocks(&self, date: NaiveDate) -> String {
        let body: String = self
            .stocks(date)
            .iter()
            .map(|(ticker, quantity)| format!("{ticker}, {quantity}; "))
            .collect();
        format!("'{}'\n{{{body}}}", self.key.name)
    }
}

fn check_quantity(quantity: f64) -> Result<(), PortfolioError> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(PortfolioError::InvalidQuantity { quantity })
    }
}
