//! Portfolio performance chart with span-dependent sampling.
//!
//! The sampling step is picked from the total span: daily up to 30 days,
//! monthly up to 730 days, yearly beyond. Steps without an exact close for
//! any held instrument are skipped, not interpolated.

use crate::domain::{Portfolio, PortfolioError};
use chrono::{Duration, Months, NaiveDate};
use std::fmt;

/// Spans of this many days or fewer are too short to chart.
pub const MIN_SPAN_DAYS: i64 = 5;

/// Width of the longest bar, in asterisks.
pub const MAX_BAR_WIDTH: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Monthly,
    Yearly,
}

impl Granularity {
    pub fn for_span(days: i64) -> Self {
        if days <= 30 {
            Granularity::Daily
        } else if days <= 730 {
            Granularity::Monthly
        } else {
            Granularity::Yearly
        }
    }

    /// strftime pattern for the row labels.
    pub fn label_format(self) -> &'static str {
        match self {
            Granularity::Daily => "%d %b %Y",
            Granularity::Monthly => "%b %Y",
            Granularity::Yearly => "%Y",
        }
    }

    /// The `n`-th sampling date counted from `start`.
    ///
    /// Calendar steps are taken from `start` each time rather than chained,
    /// so a month-end start does not drift (Jan 31 → Feb 29 → Mar 31).
    pub fn nth_step(self, start: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self {
            Granularity::Daily => start.checked_add_signed(Duration::days(i64::from(n))),
            Granularity::Monthly => start.checked_add_months(Months::new(n)),
            Granularity::Yearly => start.checked_add_months(Months::new(n.checked_mul(12)?)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A rendered-on-demand asterisk chart of portfolio value.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceChart {
    pub portfolio: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
    pub points: Vec<ChartPoint>,
    /// Dollars per asterisk; never below 1.
    pub scale: f64,
}

impl PerformanceChart {
    pub fn bar_length(&self, value: f64) -> usize {
        (value / self.scale).floor().max(0.0) as usize
    }
}

impl fmt::Display for PerformanceChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Performance of portfolio '{}' from {} to {}",
            self.portfolio, self.start, self.end
        )?;
        let label = self.granularity.label_format();
        for point in &self.points {
            writeln!(
                f,
                "{}: {}",
                point.date.format(label),
                "*".repeat(self.bar_length(point.value))
            )?;
        }
        write!(f, "Scale: * = ${:.2}", self.scale)
    }
}

/// Result of a chart request; an empty walk is a message, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Chart(PerformanceChart),
    NoData,
}

impl fmt::Display for ChartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartOutcome::Chart(chart) => chart.fmt(f),
            ChartOutcome::NoData => f.write_str("No data available for the given date range."),
        }
    }
}

impl Portfolio {
    /// Chart the portfolio's value from `start` to `end`.
    pub fn performance_over_time(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ChartOutcome, PortfolioError> {
        if end <= start {
            return Err(PortfolioError::InvalidRange { start, end });
        }
        let days = (end - start).num_days();
        if days <= MIN_SPAN_DAYS {
            return Err(PortfolioError::InsufficientSpan { days });
        }
        for boundary in [start, end] {
            if !self.instruments().any(|s| s.resolve_date(boundary).is_some()) {
                return Err(PortfolioError::NoPriceData {
                    ticker: format!("portfolio '{}'", self.name()),
                    date: boundary,
                });
            }
        }

        let granularity = Granularity::for_span(days);
        let mut points = Vec::new();
        let mut n = 0;
        while let Some(date) = granularity.nth_step(start, n) {
            if date > end {
                break;
            }
            if self.instruments().any(|s| s.has_price_on(date)) {
                points.push(ChartPoint {
                    date,
                    value: self.portfolio_value(date)?,
                });
            }
            n += 1;
        }

        if points.is_empty() {
            return Ok(ChartOutcome::NoData);
        }

        let max_value = points.iter().map(|p| p.value).fold(0.0, f64::max);
        let scale = (max_value / MAX_BAR_WIDTH).max(1.0);

        Ok(ChartOutcome::Chart(PerformanceChart {
            portfolio: self.name().to_string(),
            start,
            end,
            granularity,
            points,
            scale,
        }))
    }
}
