//! PriceSeries — append-only close-price history for one ticker.

use super::error::PortfolioError;
use chrono::{Duration, NaiveDate};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Day offsets tried, in order, when a requested date has no close.
///
/// Weekends and holidays leave holes in daily data; the search tolerates a
/// gap of up to two days on either side and always prefers the later day.
pub const RESOLUTION_OFFSETS: [i64; 5] = [0, 1, -1, 2, -2];

/// Daily close history for a single instrument.
///
/// Equality, ordering and hashing consider the ticker only, so a series can be
/// used as a map key regardless of how much history it carries.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    ticker: String,
    history: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    /// Build a series from a seed history.
    ///
    /// `is_valid_ticker` is the external valid-ticker check; a rejected ticker
    /// fails with `InvalidTicker`. Every seed close must be finite and positive.
    pub fn new<F>(
        ticker: impl Into<String>,
        history: BTreeMap<NaiveDate, f64>,
        is_valid_ticker: F,
    ) -> Result<Self, PortfolioError>
    where
        F: FnOnce(&str) -> bool,
    {
        let ticker = ticker.into();
        if !is_valid_ticker(&ticker) {
            return Err(PortfolioError::InvalidTicker { ticker });
        }
        if let Some((&date, &price)) = history.iter().find(|(_, price)| !is_valid_price(**price)) {
            return Err(PortfolioError::InvalidPrice {
                ticker,
                date,
                price,
            });
        }
        Ok(Self { ticker, history })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn history(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.history
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.history.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Append a close. Only strictly-later, previously-absent dates are accepted.
    pub fn add_closing(&mut self, price: f64, date: NaiveDate) -> Result<(), PortfolioError> {
        if !is_valid_price(price) {
            return Err(PortfolioError::InvalidPrice {
                ticker: self.ticker.clone(),
                date,
                price,
            });
        }
        if let Some(latest) = self.latest_date() {
            if date <= latest {
                return Err(PortfolioError::StaleOrDuplicateDate {
                    ticker: self.ticker.clone(),
                    date,
                    latest,
                });
            }
        }
        self.history.insert(date, price);
        Ok(())
    }

    /// Nearest-date resolution: the first of `date`, +1, -1, +2, -2 that has a close.
    pub fn resolve_date(&self, date: NaiveDate) -> Option<NaiveDate> {
        RESOLUTION_OFFSETS
            .iter()
            .filter_map(|&offset| date.checked_add_signed(Duration::days(offset)))
            .find(|candidate| self.history.contains_key(candidate))
    }

    /// Like [`resolve_date`](Self::resolve_date) but fails with `NoPriceData`.
    pub fn require_date(&self, date: NaiveDate) -> Result<NaiveDate, PortfolioError> {
        self.resolve_date(date)
            .ok_or_else(|| PortfolioError::NoPriceData {
                ticker: self.ticker.clone(),
                date,
            })
    }

    /// Close at the resolved date.
    pub fn closing_price(&self, date: NaiveDate) -> Result<f64, PortfolioError> {
        let resolved = self.require_date(date)?;
        Ok(self.history[&resolved])
    }

    /// Exact-date presence, without nearest-date resolution.
    pub fn has_price_on(&self, date: NaiveDate) -> bool {
        self.history.contains_key(&date)
    }
}

fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

impl PartialEq for PriceSeries {
    fn eq(&self, other: &Self) -> bool {
        self.ticker == other.ticker
    }
}

impl Eq for PriceSeries {}

impl Hash for PriceSeries {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ticker.hash(state);
    }
}

impl PartialOrd for PriceSeries {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriceSeries {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticker.cmp(&other.ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(points: &[(NaiveDate, f64)]) -> PriceSeries {
        PriceSeries::new("AAPL", points.iter().copied().collect(), |_| true).unwrap()
    }

    #[test]
    fn rejects_invalid_ticker() {
        let err = PriceSeries::new("NOPE", BTreeMap::new(), |t| t == "AAPL").unwrap_err();
        assert_eq!(
            err,
            PortfolioError::InvalidTicker {
                ticker: "NOPE".into()
            }
        );
    }

    #[test]
    fn rejects_non_positive_seed_price() {
        let history: BTreeMap<_, _> = [(d(2024, 1, 2), 0.0)].into_iter().collect();
        assert!(matches!(
            PriceSeries::new("AAPL", history, |_| true),
            Err(PortfolioError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn add_closing_appends_later_dates_only() {
        let mut s = series(&[(d(2024, 1, 2), 100.0)]);
        s.add_closing(101.0, d(2024, 1, 3)).unwrap();
        assert_eq!(s.len(), 2);

        let dup = s.add_closing(102.0, d(2024, 1, 3));
        assert!(matches!(dup, Err(PortfolioError::StaleOrDuplicateDate { .. })));

        let stale = s.add_closing(99.0, d(2024, 1, 1));
        assert!(matches!(stale, Err(PortfolioError::StaleOrDuplicateDate { .. })));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn add_closing_on_empty_series_accepts_any_date() {
        let mut s = series(&[]);
        s.add_closing(50.0, d(2020, 6, 1)).unwrap();
        assert_eq!(s.latest_date(), Some(d(2020, 6, 1)));
    }

    #[test]
    fn resolution_prefers_exact_then_later_then_earlier() {
        let base = d(2024, 3, 10);
        let s = series(&[(d(2024, 3, 9), 1.0), (d(2024, 3, 11), 2.0)]);
        // +1 wins over -1
        assert_eq!(s.resolve_date(base), Some(d(2024, 3, 11)));

        let s = series(&[(d(2024, 3, 8), 1.0), (d(2024, 3, 12), 2.0)]);
        // +2 wins over -2
        assert_eq!(s.resolve_date(base), Some(d(2024, 3, 12)));

        let s = series(&[(d(2024, 3, 8), 1.0), (d(2024, 3, 9), 2.0)]);
        assert_eq!(s.resolve_date(base), Some(d(2024, 3, 9)));
    }

    #[test]
    fn resolution_stops_at_two_days() {
        let s = series(&[(d(2024, 3, 13), 5.0)]);
        let err = s.closing_price(d(2024, 3, 10)).unwrap_err();
        assert!(matches!(err, PortfolioError::NoPriceData { .. }));

        let s = series(&[(d(2024, 3, 12), 5.0)]);
        assert_eq!(s.closing_price(d(2024, 3, 10)).unwrap(), 5.0);
    }

    #[test]
    fn identity_is_ticker_only() {
        let a = series(&[(d(2024, 1, 2), 1.0)]);
        let b = series(&[]);
        assert_eq!(a, b);

        let c = PriceSeries::new("MSFT", BTreeMap::new(), |_| true).unwrap();
        assert!(a < c);
    }
}
