//! Trailing-window analytics on a single price series.
//!
//! All date arguments go through nearest-date resolution first, so a query on
//! a weekend or holiday lands on a nearby trading day.

use crate::domain::{PortfolioError, PriceSeries};
use chrono::{Duration, NaiveDate};

impl PriceSeries {
    /// Mean close over the `days`-day window ending at `date`.
    ///
    /// Both the window end (`date`) and the window start (`resolved - days`)
    /// are resolved; every stored close in between, inclusive, is averaged.
    pub fn moving_average(&self, date: NaiveDate, days: u32) -> Result<f64, PortfolioError> {
        let end = self.require_date(date)?;
        let window_start = end
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        // `end` itself is a candidate within two days, so `start <= end`
        let start = self.require_date(window_start)?;

        let (sum, count) = self
            .history()
            .range(start..=end)
            .fold((0.0, 0usize), |(sum, n), (_, close)| (sum + close, n + 1));
        Ok(sum / count as f64)
    }

    /// `close(end) - close(start)` over resolved dates.
    pub fn gain_loss(&self, start: NaiveDate, end: NaiveDate) -> Result<f64, PortfolioError> {
        let (start, end) = self.resolve_range(start, end)?;
        let history = self.history();
        Ok(history[&end] - history[&start])
    }

    /// Dates in `[start, end]` whose close is above its trailing `days`-day average.
    ///
    /// This flags "price above its moving average", not a crossing of two lines.
    pub fn crossovers(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        days: u32,
    ) -> Result<Vec<NaiveDate>, PortfolioError> {
        let (start, end) = self.resolve_range(start, end)?;
        let mut above = Vec::new();
        for (&date, &close) in self.history().range(start..=end) {
            if close > self.moving_average(date, days)? {
                above.push(date);
            }
        }
        Ok(above)
    }

    /// Range check on the requested dates, then resolution of both endpoints.
    fn resolve_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(NaiveDate, NaiveDate), PortfolioError> {
        if start > end {
            return Err(PortfolioError::InvalidRange { start, end });
        }
        let resolved_start = self.require_date(start)?;
        let resolved_end = self.require_date(end)?;
        if resolved_start > resolved_end {
            // two adjacent requests can resolve past each other across a gap
            return Err(PortfolioError::InvalidRange { start, end });
        }
        Ok((resolved_start, resolved_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(points: &[(NaiveDate, f64)]) -> PriceSeries {
        PriceSeries::new("AAPL", points.iter().copied().collect::<BTreeMap<_, _>>(), |_| true)
            .unwrap()
    }

    /// Ten consecutive days starting 2024-03-01 with the given closes.
    fn daily(closes: &[f64]) -> PriceSeries {
        let points: Vec<_> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| (d(2024, 3, 1) + Duration::days(i as i64), c))
            .collect();
        series(&points)
    }

    #[test]
    fn moving_average_window_start_uses_nearest_date() {
        let s = series(&[(d(2024, 1, 1), 150.0), (d(2024, 2, 1), 160.0)]);
        // 2024-02-01 minus 31 days is 2024-01-01
        assert_eq!(s.moving_average(d(2024, 2, 1), 31).unwrap(), 155.0);
        // minus 30 days is 2024-01-02, resolves back to 2024-01-01
        assert_eq!(s.moving_average(d(2024, 2, 1), 30).unwrap(), 155.0);
    }

    #[test]
    fn moving_average_fails_without_window_start() {
        let s = series(&[(d(2024, 1, 1), 150.0), (d(2024, 2, 1), 160.0)]);
        assert!(matches!(
            s.moving_average(d(2024, 2, 1), 10),
            Err(PortfolioError::NoPriceData { .. })
        ));
    }

    #[test]
    fn moving_average_of_consecutive_days() {
        let s = daily(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        // window 2024-03-03 ..= 2024-03-05
        assert_eq!(s.moving_average(d(2024, 3, 5), 2).unwrap(), 13.0);
        // zero-day window is the close itself
        assert_eq!(s.moving_average(d(2024, 3, 5), 0).unwrap(), 14.0);
    }

    #[test]
    fn gain_loss_over_resolved_dates() {
        let s = series(&[(d(2024, 1, 2), 100.0), (d(2024, 1, 5), 104.5)]);
        // 2024-01-06 resolves to 2024-01-05 via -1
        assert_eq!(s.gain_loss(d(2024, 1, 2), d(2024, 1, 6)).unwrap(), 4.5);
        assert_eq!(s.gain_loss(d(2024, 1, 5), d(2024, 1, 5)).unwrap(), 0.0);
    }

    #[test]
    fn gain_loss_rejects_reversed_range() {
        let s = series(&[(d(2024, 1, 2), 100.0), (d(2024, 1, 5), 104.5)]);
        assert_eq!(
            s.gain_loss(d(2024, 1, 5), d(2024, 1, 2)),
            Err(PortfolioError::InvalidRange {
                start: d(2024, 1, 5),
                end: d(2024, 1, 2)
            })
        );
    }

    #[test]
    fn gain_loss_without_data_fails() {
        let s = series(&[(d(2024, 1, 2), 100.0)]);
        assert!(matches!(
            s.gain_loss(d(2024, 1, 2), d(2024, 2, 2)),
            Err(PortfolioError::NoPriceData { .. })
        ));
    }

    #[test]
    fn crossovers_flag_closes_above_trailing_average() {
        let s = daily(&[10.0, 9.0, 11.0, 10.0, 12.0, 8.0]);
        // 1-day windows: each close against mean(prev, self)
        let above = s.crossovers(d(2024, 3, 2), d(2024, 3, 6), 1).unwrap();
        assert_eq!(above, vec![d(2024, 3, 3), d(2024, 3, 5)]);
    }

    #[test]
    fn crossovers_propagate_missing_window() {
        let s = daily(&[10.0, 9.0, 11.0]);
        // the first day's 5-day window starts before any data
        assert!(matches!(
            s.crossovers(d(2024, 3, 1), d(2024, 3, 3), 5),
            Err(PortfolioError::NoPriceData { .. })
        ));
    }
}
